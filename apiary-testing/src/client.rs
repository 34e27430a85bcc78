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

//! HTTP clients for the two surfaces.

use crate::error::ClientError;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// One entry of a response's `errors` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

impl GraphQlError {
    pub fn code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(Value::as_str)
    }
}

/// Raw response of a query, errors included.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
    #[serde(skip)]
    pub status: u16,
}

impl GraphQlResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.errors.is_empty()
    }

    /// Turn the response into its data, or the error it reported.
    pub fn into_data(self) -> Result<Value, ClientError> {
        if !self.errors.is_empty() {
            return Err(ClientError::Query {
                status: self.status,
                errors: self.errors,
            });
        }
        self.data.ok_or(ClientError::MissingData)
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Shared transport for both surface clients.
#[derive(Debug, Clone)]
struct GraphQlClient {
    http: reqwest::Client,
    url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl GraphQlClient {
    fn new(http: reqwest::Client, url: String) -> Self {
        Self {
            http,
            url,
            token: Arc::new(RwLock::new(None)),
        }
    }

    async fn send(&self, document: &str) -> Result<GraphQlResponse, ClientError> {
        let mut request = self.http.post(&self.url).json(&json!({ "query": document }));
        // Clone out of the lock so no guard is held across the await.
        let token = self.token.read().clone();
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let mut parsed: GraphQlResponse = serde_json::from_str(&body)
            .map_err(|_| ClientError::Status { status, body })?;
        parsed.status = status;
        tracing::trace!(url = %self.url, status, errors = parsed.errors.len(), "Query response");
        Ok(parsed)
    }
}

/// Client for the public shop surface.
#[derive(Debug, Clone)]
pub struct ShopClient {
    inner: GraphQlClient,
}

impl ShopClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            inner: GraphQlClient::new(http, url.into()),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Run a query and return its `data`, failing on any reported error.
    pub async fn query(&self, document: &str) -> Result<Value, ClientError> {
        self.inner.send(document).await?.into_data()
    }

    /// Run a query and return the raw response.
    pub async fn query_with_errors(&self, document: &str) -> Result<GraphQlResponse, ClientError> {
        self.inner.send(document).await
    }
}

/// Client for the admin surface. Queries carry the session token obtained
/// through [`AdminClient::login`] or [`AdminClient::as_super_admin`].
#[derive(Debug, Clone)]
pub struct AdminClient {
    inner: GraphQlClient,
    superadmin: (String, String),
}

impl AdminClient {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        superadmin_identifier: impl Into<String>,
        superadmin_password: impl Into<String>,
    ) -> Self {
        Self {
            inner: GraphQlClient::new(http, url.into()),
            superadmin: (superadmin_identifier.into(), superadmin_password.into()),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Log in with the given credentials and keep the session for later queries.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let url = format!("{}/login", self.inner.url);
        let response = self
            .inner
            .http
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            let parsed = serde_json::from_str::<GraphQlResponse>(&body).ok();
            return Err(match parsed {
                Some(parsed) if !parsed.errors.is_empty() => ClientError::Query {
                    status,
                    errors: parsed.errors,
                },
                _ => ClientError::Status { status, body },
            });
        }

        let login: LoginResponse =
            serde_json::from_str(&body).map_err(|_| ClientError::Status { status, body })?;
        *self.inner.token.write() = Some(login.token);
        tracing::debug!(username = %username, "Admin client logged in");
        Ok(())
    }

    /// Log in as the configured superadmin.
    pub async fn as_super_admin(&self) -> Result<(), ClientError> {
        let (identifier, password) = &self.superadmin;
        self.login(identifier, password).await
    }

    /// Forget the current session.
    pub fn logout(&self) {
        *self.inner.token.write() = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.token.read().is_some()
    }

    pub async fn query(&self, document: &str) -> Result<Value, ClientError> {
        self.inner.send(document).await?.into_data()
    }

    pub async fn query_with_errors(&self, document: &str) -> Result<GraphQlResponse, ClientError> {
        self.inner.send(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_into_data() {
        let mut response: GraphQlResponse =
            serde_json::from_value(json!({"data": {"products": []}})).unwrap();
        response.status = 200;
        assert!(response.is_success());
        assert_eq!(response.into_data().unwrap(), json!({"products": []}));
    }

    #[test]
    fn test_error_response_into_data() {
        let mut response: GraphQlResponse = serde_json::from_value(json!({
            "errors": [{"message": "nope", "extensions": {"code": "UNAUTHORIZED"}}]
        }))
        .unwrap();
        response.status = 401;
        assert!(!response.is_success());

        let err = response.into_data().unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.code(), Some("UNAUTHORIZED"));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_empty_response_is_missing_data() {
        let response: GraphQlResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(response.into_data(), Err(ClientError::MissingData)));
    }
}
