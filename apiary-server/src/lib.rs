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

pub mod auth;
pub mod config;
pub mod error;
pub mod router;
pub mod schema;
pub mod seed;
pub mod service;

use anyhow::Result;
use apiary_plugins::{
    ApiSurface, LifecycleDispatcher, LoggingPlugin, PluginRegistration, StartupReport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::{AnonymousAuth, Authenticator, SessionIssuer};
use config::ServerConfig;
use router::{surface_router, SurfaceState};
use schema::{CatalogEngine, CatalogStore, NewAdministrator, ResolutionEngine};
use seed::{DataProvisioner, SeedData};
use service::compose_services;

pub use error::{ApiError, StartupError};

/// Configures and starts an [`ApiServer`].
pub struct ApiServerBuilder {
    config: ServerConfig,
    registration: PluginRegistration,
    seed: Option<SeedData>,
    engine: Option<Arc<dyn ResolutionEngine>>,
}

impl ApiServerBuilder {
    /// Plugins for this instance, in hook order.
    pub fn plugins(mut self, registration: PluginRegistration) -> Self {
        self.registration = registration;
        self
    }

    /// Seed data to provision, taking precedence over `seed.initial_data`.
    pub fn seed(mut self, seed: SeedData) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the catalog engine.
    pub fn engine(mut self, engine: Arc<dyn ResolutionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Start the server.
    ///
    /// Provisioning and every `server_will_start` hook complete before either
    /// surface binds, so no request can arrive early. Returns once both
    /// surfaces accept connections.
    pub async fn start(self) -> Result<ApiServer, StartupError> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| StartupError::Config(format!("{e:#}")))?;

        let store = Arc::new(CatalogStore::new());
        store.insert_administrator(NewAdministrator {
            identifier: config.auth.superadmin_identifier.clone(),
            first_name: "Super".to_string(),
            last_name: "Admin".to_string(),
        });

        let seed = match (self.seed, &config.seed.initial_data) {
            (Some(seed), _) => Some(seed),
            (None, Some(path)) => Some(SeedData::from_file(path)?),
            (None, None) => None,
        };
        if let Some(seed) = &seed {
            DataProvisioner::new(store.clone()).provision(seed).await?;
        }

        let engine = self.engine.unwrap_or_else(|| {
            Arc::new(CatalogEngine::new(store.clone())) as Arc<dyn ResolutionEngine>
        });
        let dispatcher = Arc::new(LifecycleDispatcher::new(self.registration));

        let plugins = dispatcher
            .plugin_names()
            .into_iter()
            .map(String::from)
            .collect();
        let service = compose_services(&config, engine.as_ref(), plugins)?;

        let startup = dispatcher.server_will_start(&service).await?;
        tracing::info!(
            plugins = ?startup.plugins_started,
            total_time_us = startup.total_time_us,
            "Plugins started"
        );

        let mut listeners = Vec::with_capacity(ApiSurface::ALL.len());
        for surface in ApiSurface::ALL {
            let addr = config
                .socket_addr(surface)
                .map_err(|e| StartupError::Config(e.to_string()))?;
            let bind_error = |source| StartupError::Bind {
                surface,
                addr,
                source,
            };
            let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
            let local_addr = listener.local_addr().map_err(bind_error)?;
            listeners.push((surface, listener, local_addr));
        }

        let issuer = Arc::new(SessionIssuer::new(&config.auth));
        let shutdown = CancellationToken::new();
        let mut tasks = Vec::with_capacity(listeners.len());
        let mut addrs = Vec::with_capacity(listeners.len());

        for (surface, listener, local_addr) in listeners {
            let (authenticator, sessions) = match surface {
                ApiSurface::Shop => (Arc::new(AnonymousAuth) as Arc<dyn Authenticator>, None),
                ApiSurface::Admin => (
                    Arc::new(issuer.authenticator()) as Arc<dyn Authenticator>,
                    Some(issuer.clone()),
                ),
            };
            let state = SurfaceState {
                surface,
                dispatcher: dispatcher.clone(),
                engine: engine.clone(),
            };
            let app = surface_router(
                state,
                config.api_path(surface),
                authenticator,
                sessions,
                config.server.enable_cors,
            );

            tracing::info!(
                "{} API listening on http://{}{}",
                surface,
                local_addr,
                config.api_path(surface)
            );

            let token = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                let result = axum::serve(listener, app)
                    .with_graceful_shutdown(async move { token.cancelled().await })
                    .await;
                if let Err(e) = result {
                    tracing::error!(surface = %surface, error = %e, "API server error");
                }
            }));
            addrs.push((surface, local_addr));
        }

        Ok(ApiServer {
            config,
            store,
            dispatcher,
            startup,
            addrs,
            shutdown,
            tasks,
        })
    }
}

/// A running server instance with both surfaces bound.
///
/// Dropping the server stops both surfaces without waiting for them;
/// [`ApiServer::shutdown`] also waits until every connection is closed.
pub struct ApiServer {
    config: ServerConfig,
    store: Arc<CatalogStore>,
    dispatcher: Arc<LifecycleDispatcher>,
    startup: StartupReport,
    addrs: Vec<(ApiSurface, SocketAddr)>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ApiServer {
    pub fn builder(config: ServerConfig) -> ApiServerBuilder {
        ApiServerBuilder {
            config,
            registration: PluginRegistration::new(),
            seed: None,
            engine: None,
        }
    }

    /// Address a surface is bound to, `None` if it has no listener.
    pub fn local_addr(&self, surface: ApiSurface) -> Option<SocketAddr> {
        self.addrs
            .iter()
            .find(|(s, _)| *s == surface)
            .map(|(_, addr)| *addr)
    }

    /// `http://host:port` of a surface.
    pub fn base_url(&self, surface: ApiSurface) -> Option<String> {
        self.local_addr(surface).map(|addr| format!("http://{addr}"))
    }

    /// Full URL of a surface's query endpoint.
    pub fn api_url(&self, surface: ApiSurface) -> Option<String> {
        self.base_url(surface)
            .map(|base| format!("{base}{}", self.config.api_path(surface)))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<LifecycleDispatcher> {
        &self.dispatcher
    }

    pub fn startup_report(&self) -> &StartupReport {
        &self.startup
    }

    /// Stop both surfaces and wait for their tasks to finish.
    pub async fn shutdown(mut self) {
        tracing::info!("Shutting down API server");
        self.shutdown.cancel();

        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "API server task did not finish cleanly");
            }
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "apiary_server=info,apiary_plugins=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Apiary Server");
    tracing::info!("Server configuration: {:#?}", config.server);

    // Validate configuration
    config.validate()?;

    let registration = PluginRegistration::new().with(LoggingPlugin::default())?;
    let server = ApiServer::builder(config)
        .plugins(registration)
        .start()
        .await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    server.shutdown().await;

    Ok(())
}
