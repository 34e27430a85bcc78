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

use crate::config::AuthConfig;
use crate::error::error_body;
use axum::{
    extract::Request as AxumRequest,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::sync::Arc;

// Type alias for the request type we use
type Request = AxumRequest;

/// Authentication context attached to each authenticated request
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated administrator, `None` for anonymous shop requests
    pub identifier: Option<String>,
    pub privileged: bool,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self {
            identifier: None,
            privileged: false,
        }
    }
}

/// Authentication error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("Invalid authentication credentials")]
    InvalidCredentials,

    #[error("Session token validation failed: {0}")]
    JwtValidation(String),

    #[error("Failed to issue session token: {0}")]
    TokenIssue(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidCredentials
            | AuthError::JwtValidation(_) => StatusCode::UNAUTHORIZED,
            AuthError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AuthError::TokenIssue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            StatusCode::FORBIDDEN => "FORBIDDEN",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = error_body(self.to_string(), self.code(), Map::new());
        (self.status(), Json(body)).into_response()
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Administrator identifier
    pub iat: usize,
    pub exp: usize, // Expiration time
}

/// Authenticator trait for pluggable auth strategies
pub trait Authenticator: Send + Sync {
    /// Authenticate request by examining headers (synchronous)
    fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError>;
}

/// Authenticator for the public shop surface (no credentials required)
pub struct AnonymousAuth;

impl Authenticator for AnonymousAuth {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        Ok(AuthContext::anonymous())
    }
}

/// Bearer token (JWT) authenticator for the admin surface
pub struct BearerTokenAuth {
    jwt_secret: Vec<u8>,
}

impl BearerTokenAuth {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            jwt_secret: jwt_secret.as_bytes().to_vec(),
        }
    }
}

impl Authenticator for BearerTokenAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        // Extract Bearer token from Authorization header
        let auth_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingCredentials)?;

        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(&self.jwt_secret),
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|e| AuthError::JwtValidation(e.to_string()))?;

        Ok(AuthContext {
            identifier: Some(token_data.claims.sub),
            privileged: true,
        })
    }
}

/// A freshly issued admin session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub identifier: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues signed session tokens for the superadmin.
pub struct SessionIssuer {
    identifier: String,
    password: String,
    jwt_secret: Vec<u8>,
    duration: Duration,
}

impl SessionIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            identifier: config.superadmin_identifier.clone(),
            password: config.superadmin_password.clone(),
            jwt_secret: config.session_secret.as_bytes().to_vec(),
            duration: Duration::seconds(config.session_duration_secs as i64),
        }
    }

    /// Authenticator accepting the tokens this issuer signs.
    pub fn authenticator(&self) -> BearerTokenAuth {
        BearerTokenAuth {
            jwt_secret: self.jwt_secret.clone(),
        }
    }

    /// Exchange credentials for a session token.
    pub fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        if username != self.identifier || password != self.password {
            tracing::warn!(username = %username, "Rejected admin login");
            return Err(AuthError::InvalidCredentials);
        }

        let issued_at = Utc::now();
        let expires_at = issued_at + self.duration;
        let claims = Claims {
            sub: self.identifier.clone(),
            iat: issued_at.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(&self.jwt_secret),
        )
        .map_err(|e| AuthError::TokenIssue(e.to_string()))?;

        tracing::info!(identifier = %self.identifier, "Admin session issued");
        Ok(Session {
            token,
            identifier: self.identifier.clone(),
            expires_at,
        })
    }
}

/// Authentication middleware
///
/// Rejected requests are answered here and never reach the handler.
pub async fn auth_middleware(
    auth: axum::Extension<Arc<dyn Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    match auth.authenticate(req.headers()) {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            Ok(next.run(req).await)
        }
        Err(err) => {
            tracing::debug!(
                path = %req.uri().path(),
                error = %err,
                "Request rejected by authenticator"
            );
            Err(err)
        }
    }
}
