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

//! Dual-surface request routing.
//!
//! Both surfaces are built from the same handlers and share one
//! [`LifecycleDispatcher`] and one [`ResolutionEngine`]. They differ only in
//! the authenticator guarding the query route and in whether the login
//! route is mounted.

use crate::auth::{auth_middleware, AuthContext, AuthError, Authenticator, Session, SessionIssuer};
use crate::error::ApiError;
use crate::schema::{Document, ResolutionEngine, ResolutionError};
use apiary_plugins::{ApiSurface, LifecycleDispatcher, RequestInfo, ResponsePayload};
use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Per-surface handler state.
#[derive(Clone)]
pub struct SurfaceState {
    pub surface: ApiSurface,
    pub dispatcher: Arc<LifecycleDispatcher>,
    pub engine: Arc<dyn ResolutionEngine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub data: ResponsePayload,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub surface: ApiSurface,
    pub plugins: usize,
    pub version: &'static str,
}

/// POST {api_path} - Execute a query document
pub async fn execute_query(
    State(state): State<SurfaceState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    if state.surface.is_privileged() && !auth.privileged {
        return Err(AuthError::Unauthorized("an admin session is required".to_string()).into());
    }

    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let parsed = Document::parse(&request.query);
    let operation_name = request.operation_name.or_else(|| {
        parsed
            .as_ref()
            .ok()
            .and_then(|document| document.operation_name.clone())
    });
    let query: Arc<str> = request.query.into();

    let info = RequestInfo::new(state.surface, operation_name, query.clone());
    tracing::debug!(
        request_id = %info.id(),
        surface = %state.surface,
        operation = info.operation_name().unwrap_or("<anonymous>"),
        identifier = auth.identifier.as_deref().unwrap_or("<anonymous>"),
        "Executing query"
    );

    // Syntax errors surface from inside resolution so request-start hooks
    // still observe the request.
    let resolution = async {
        match parsed {
            Ok(document) => state.engine.resolve(&document, state.surface).await,
            Err(err) => Err(ResolutionError::Syntax(err)),
        }
    };

    // The dispatcher hands back the payload its listeners saw; that exact
    // value is what gets serialized.
    let data = state.dispatcher.execute(info, resolution).await?;

    Ok(Json(QueryResponse { data }))
}

/// POST {admin_api_path}/login - Exchange superadmin credentials for a session
pub async fn login(
    State(issuer): State<Arc<SessionIssuer>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(issuer.login(&request.username, &request.password)?))
}

/// GET /health - Liveness check outside the plugin pipeline
pub async fn health_check(State(state): State<SurfaceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        surface: state.surface,
        plugins: state.dispatcher.plugin_count(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn cors_layer(enable_cors: bool) -> CorsLayer {
    if enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    }
}

/// Build the router for one surface.
///
/// `sessions` mounts `{api_path}/login` when present.
pub fn surface_router(
    state: SurfaceState,
    api_path: &str,
    authenticator: Arc<dyn Authenticator>,
    sessions: Option<Arc<SessionIssuer>>,
    enable_cors: bool,
) -> Router {
    let api_routes = Router::new()
        .route(api_path, post(execute_query))
        .layer(middleware::from_fn(auth_middleware))
        .layer(Extension(authenticator));

    let mut app: Router = Router::new()
        .route("/health", get(health_check))
        .merge(api_routes)
        .with_state(state);

    if let Some(issuer) = sessions {
        app = app.merge(
            Router::new()
                .route(&format!("{api_path}/login"), post(login))
                .with_state(issuer),
        );
    }

    app.layer(cors_layer(enable_cors))
        .layer(TraceLayer::new_for_http())
}
