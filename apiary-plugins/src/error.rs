// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Plugin error types

use thiserror::Error;

/// Result type returned by plugin hooks
pub type HookResult<T> = Result<T, HookError>;

/// Errors a plugin hook can report back to the dispatcher
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook execution failed: {0}")]
    ExecutionFailed(String),
}

impl HookError {
    /// Shorthand for [`HookError::ExecutionFailed`].
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::ExecutionFailed(message.into())
    }
}
