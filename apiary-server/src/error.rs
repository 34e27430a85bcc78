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

//! Server error types.

use crate::auth::AuthError;
use crate::schema::ResolutionError;
use crate::seed::SeedError;
use apiary_plugins::{ApiSurface, DispatchError, RequestError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use thiserror::Error;

/// Build a `{ "errors": [...] }` body with a single entry.
pub fn error_body(message: impl Into<String>, code: &str, extra: Map<String, Value>) -> Value {
    let mut extensions = extra;
    extensions.insert("code".to_string(), Value::String(code.to_string()));
    json!({
        "errors": [{
            "message": message.into(),
            "extensions": extensions,
        }]
    })
}

/// The server could not be started.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema composition failed: {0}")]
    Composition(String),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error("Startup aborted: {0}")]
    Hook(#[from] DispatchError),

    #[error("Failed to bind {surface} API on {addr}: {source}")]
    Bind {
        surface: ApiSurface,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Request-level failure on either surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Hook(#[from] DispatchError),
}

impl From<RequestError<ResolutionError>> for ApiError {
    fn from(err: RequestError<ResolutionError>) -> Self {
        match err {
            RequestError::Hook(e) => ApiError::Hook(e),
            RequestError::Resolution(e) => ApiError::Resolution(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            ApiError::Auth(e) => return e.into_response(),
            ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                error_body(message, "BAD_USER_INPUT", Map::new()),
            ),
            // Query errors travel in the body of a successful response.
            ApiError::Resolution(e) => (StatusCode::OK, error_body(message, e.code(), Map::new())),
            ApiError::Hook(e) => {
                let mut extra = Map::new();
                extra.insert("plugin".to_string(), json!(e.plugin()));
                extra.insert("hook".to_string(), json!(e.hook().as_str()));
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body(message, "PLUGIN_HOOK_FAILED", extra),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DocumentError;

    #[test]
    fn test_error_body_shape() {
        let body = error_body("nope", "FORBIDDEN", Map::new());
        assert_eq!(
            body,
            json!({"errors": [{"message": "nope", "extensions": {"code": "FORBIDDEN"}}]})
        );
    }

    #[test]
    fn test_status_mapping() {
        let resolution = ApiError::from(RequestError::Resolution(ResolutionError::Syntax(
            DocumentError {
                offset: 0,
                message: "empty document".to_string(),
            },
        )));
        assert_eq!(resolution.into_response().status(), StatusCode::OK);

        let bad = ApiError::BadRequest("missing query".to_string());
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
