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

//! Harness error types.

use crate::client::GraphQlError;
use apiary_plugins::{ApiSurface, RegistryError};
use apiary_server::seed::SeedError;
use apiary_server::StartupError;
use thiserror::Error;

/// A test environment could not be brought up.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Plugin registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Server failed to start: {0}")]
    Startup(#[from] StartupError),

    #[error("Failed to load seed data: {0}")]
    Seed(#[from] SeedError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Surface {0} has no listener")]
    Unbound(ApiSurface),
}

/// A client call against a running surface failed.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Query failed (status {status}): {}", join_messages(.errors))]
    Query { status: u16, errors: Vec<GraphQlError> },

    #[error("Response carried neither data nor errors")]
    MissingData,
}

impl ClientError {
    /// HTTP status of the response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            ClientError::Status { status, .. } | ClientError::Query { status, .. } => Some(*status),
            ClientError::MissingData => None,
        }
    }

    /// `extensions.code` of the first reported error.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Query { errors, .. } => errors.first().and_then(GraphQlError::code),
            _ => None,
        }
    }
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
