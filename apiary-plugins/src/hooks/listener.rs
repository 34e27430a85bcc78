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

//! Per-request listeners returned from `request_did_start`.

use super::context::RequestContext;
use super::plugin::{HookSet, LifecycleHook};
use crate::error::HookError;
use async_trait::async_trait;

/// Hooks scoped to a single request.
///
/// A fresh listener is produced for every request, so any state it carries is
/// never shared with another in-flight request.
#[async_trait]
pub trait RequestListener: Send + Sync {
    /// Hooks this listener implements. Defaults to `willSendResponse`.
    fn hooks(&self) -> HookSet {
        HookSet::from(LifecycleHook::WillSendResponse)
    }

    /// Called with the finalized payload, before it is written to the transport.
    async fn will_send_response(&self, _context: &RequestContext) -> Result<(), HookError> {
        Ok(())
    }
}

/// Listener that forwards the finalized context to a callback.
pub struct CallbackListener<F>
where
    F: Fn(&RequestContext) -> Result<(), HookError> + Send + Sync,
{
    callback: F,
}

impl<F> CallbackListener<F>
where
    F: Fn(&RequestContext) -> Result<(), HookError> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> RequestListener for CallbackListener<F>
where
    F: Fn(&RequestContext) -> Result<(), HookError> + Send + Sync + 'static,
{
    async fn will_send_response(&self, context: &RequestContext) -> Result<(), HookError> {
        (self.callback)(context)
    }
}
