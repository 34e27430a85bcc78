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

//! One server instance with a client per surface.

use crate::client::{AdminClient, ShopClient};
use crate::error::SetupError;
use apiary_plugins::{ApiSurface, PluginRegistration, SharedPlugin};
use apiary_server::config::ServerConfig;
use apiary_server::seed::SeedData;
use apiary_server::ApiServer;
use std::path::Path;

/// Data provisioned before the server starts.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub initial_data: SeedData,
    /// Overrides the customer count of `initial_data`.
    pub customer_count: Option<usize>,
}

impl InitOptions {
    pub fn new(initial_data: SeedData) -> Self {
        Self {
            initial_data,
            customer_count: None,
        }
    }

    /// Load `initial_data` from a JSON fixture file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SetupError> {
        Ok(Self::new(SeedData::from_file(path)?))
    }

    pub fn customer_count(mut self, count: usize) -> Self {
        self.customer_count = Some(count);
        self
    }
}

/// A running server plus typed clients for both surfaces.
///
/// Every [`TestEnvironment::init`] starts a fresh server with its own store,
/// dispatcher and listeners. Nothing outlives [`TestEnvironment::destroy`].
pub struct TestEnvironment {
    server: ApiServer,
    shop: ShopClient,
    admin: AdminClient,
}

impl TestEnvironment {
    /// Start a server with the given plugins, in order, and seed data.
    ///
    /// Returns once both surfaces accept connections. Fails if a plugin is
    /// registered twice, seeding fails or any `server_will_start` hook fails.
    pub async fn init(
        config: ServerConfig,
        plugins: impl IntoIterator<Item = SharedPlugin>,
        options: InitOptions,
    ) -> Result<Self, SetupError> {
        let mut registration = PluginRegistration::new();
        for plugin in plugins {
            registration.register_shared(plugin)?;
        }

        let mut seed = options.initial_data;
        if let Some(count) = options.customer_count {
            seed = seed.with_customers(count);
        }

        let server = ApiServer::builder(config)
            .plugins(registration)
            .seed(seed)
            .start()
            .await?;

        let api_url = |surface| server.api_url(surface).ok_or(SetupError::Unbound(surface));
        let shop_url = api_url(ApiSurface::Shop)?;
        let admin_url = api_url(ApiSurface::Admin)?;

        let http = reqwest::Client::builder().build()?;
        let shop = ShopClient::new(http.clone(), shop_url);
        let auth = &server.config().auth;
        let admin = AdminClient::new(
            http,
            admin_url,
            auth.superadmin_identifier.clone(),
            auth.superadmin_password.clone(),
        );

        tracing::debug!(
            shop = %shop.url(),
            admin = %admin.url(),
            plugins = server.dispatcher().plugin_count(),
            "Test environment ready"
        );

        Ok(Self { server, shop, admin })
    }

    pub fn shop_client(&self) -> &ShopClient {
        &self.shop
    }

    pub fn admin_client(&self) -> &AdminClient {
        &self.admin
    }

    pub fn server(&self) -> &ApiServer {
        &self.server
    }

    /// Stop the server and wait until both surfaces have closed.
    pub async fn destroy(self) {
        self.server.shutdown().await;
        tracing::debug!("Test environment destroyed");
    }
}
