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

use anyhow::Result;
use apiary_plugins::ApiSurface;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Apiary Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// Host both surfaces bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Shop API port (0 = ephemeral)
    #[serde(default = "default_shop_port")]
    pub shop_port: u16,

    /// Admin API port (0 = ephemeral)
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,

    /// Path the shop API is mounted on
    #[serde(default = "default_shop_api_path")]
    pub shop_api_path: String,

    /// Path the admin API is mounted on
    #[serde(default = "default_admin_api_path")]
    pub admin_api_path: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Identifier of the superadmin created on every start
    #[serde(default = "default_superadmin_identifier")]
    pub superadmin_identifier: String,

    #[serde(default = "default_superadmin_password")]
    pub superadmin_password: String,

    /// HS256 secret used to sign admin session tokens
    #[serde(default = "default_session_secret")]
    pub session_secret: String,

    /// Session token lifetime in seconds
    #[serde(default = "default_session_duration")]
    pub session_duration_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SeedConfig {
    /// JSON fixture provisioned at startup
    pub initial_data: Option<PathBuf>,
}

// Default values
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_shop_port() -> u16 {
    3050
}

fn default_admin_port() -> u16 {
    3051
}

fn default_shop_api_path() -> String {
    "/shop-api".to_string()
}

fn default_admin_api_path() -> String {
    "/admin-api".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_superadmin_identifier() -> String {
    "superadmin".to_string()
}

fn default_superadmin_password() -> String {
    "superadmin".to_string()
}

fn default_session_secret() -> String {
    "apiary-development-secret".to_string()
}

fn default_session_duration() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            shop_port: default_shop_port(),
            admin_port: default_admin_port(),
            shop_api_path: default_shop_api_path(),
            admin_api_path: default_admin_api_path(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            superadmin_identifier: default_superadmin_identifier(),
            superadmin_password: default_superadmin_password(),
            session_secret: default_session_secret(),
            session_duration_secs: default_session_duration(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - APIARY_HOST: bind host (default: 127.0.0.1)
    /// - APIARY_SHOP_PORT / APIARY_ADMIN_PORT: surface ports (default: 3050 / 3051)
    /// - APIARY_SHOP_API_PATH / APIARY_ADMIN_API_PATH: surface paths
    /// - APIARY_ENABLE_CORS: Enable CORS (default: true)
    /// - APIARY_SUPERADMIN_IDENTIFIER / APIARY_SUPERADMIN_PASSWORD: superadmin credentials
    /// - APIARY_SESSION_SECRET: secret for admin session tokens
    /// - APIARY_SEED_PATH: JSON seed fixture
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("APIARY_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("APIARY_SHOP_PORT") {
            if let Ok(val) = port.parse() {
                config.server.shop_port = val;
            }
        }

        if let Ok(port) = std::env::var("APIARY_ADMIN_PORT") {
            if let Ok(val) = port.parse() {
                config.server.admin_port = val;
            }
        }

        if let Ok(path) = std::env::var("APIARY_SHOP_API_PATH") {
            config.server.shop_api_path = path;
        }

        if let Ok(path) = std::env::var("APIARY_ADMIN_API_PATH") {
            config.server.admin_api_path = path;
        }

        if let Ok(cors) = std::env::var("APIARY_ENABLE_CORS") {
            config.server.enable_cors = cors.parse().unwrap_or(true);
        }

        if let Ok(identifier) = std::env::var("APIARY_SUPERADMIN_IDENTIFIER") {
            config.auth.superadmin_identifier = identifier;
        }

        if let Ok(password) = std::env::var("APIARY_SUPERADMIN_PASSWORD") {
            config.auth.superadmin_password = password;
        }

        if let Ok(secret) = std::env::var("APIARY_SESSION_SECRET") {
            config.auth.session_secret = secret;
        }

        if let Ok(path) = std::env::var("APIARY_SEED_PATH") {
            config.seed.initial_data = Some(PathBuf::from(path));
        }

        config
    }

    /// Load configuration. Environment variables override the file, which
    /// overrides the defaults.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        // Override with environment variables
        Ok(Self::merge_with_env(config))
    }

    /// Merge config with environment variables (env takes priority)
    fn merge_with_env(mut config: Self) -> Self {
        let env_config = Self::from_env();
        let is_set = |name: &str| std::env::var(name).is_ok();

        if is_set("APIARY_HOST") {
            config.server.host = env_config.server.host;
        }
        if is_set("APIARY_SHOP_PORT") {
            config.server.shop_port = env_config.server.shop_port;
        }
        if is_set("APIARY_ADMIN_PORT") {
            config.server.admin_port = env_config.server.admin_port;
        }
        if is_set("APIARY_SHOP_API_PATH") {
            config.server.shop_api_path = env_config.server.shop_api_path;
        }
        if is_set("APIARY_ADMIN_API_PATH") {
            config.server.admin_api_path = env_config.server.admin_api_path;
        }
        if is_set("APIARY_ENABLE_CORS") {
            config.server.enable_cors = env_config.server.enable_cors;
        }
        if is_set("APIARY_SUPERADMIN_IDENTIFIER") {
            config.auth.superadmin_identifier = env_config.auth.superadmin_identifier;
        }
        if is_set("APIARY_SUPERADMIN_PASSWORD") {
            config.auth.superadmin_password = env_config.auth.superadmin_password;
        }
        if is_set("APIARY_SESSION_SECRET") {
            config.auth.session_secret = env_config.auth.session_secret;
        }
        if is_set("APIARY_SEED_PATH") {
            config.seed.initial_data = env_config.seed.initial_data;
        }

        config
    }

    /// Path a surface is mounted on.
    pub fn api_path(&self, surface: ApiSurface) -> &str {
        match surface {
            ApiSurface::Shop => &self.server.shop_api_path,
            ApiSurface::Admin => &self.server.admin_api_path,
        }
    }

    /// Address a surface binds to.
    pub fn socket_addr(&self, surface: ApiSurface) -> Result<SocketAddr> {
        let host: IpAddr = self.server.host.parse()?;
        let port = match surface {
            ApiSurface::Shop => self.server.shop_port,
            ApiSurface::Admin => self.server.admin_port,
        };
        Ok(SocketAddr::new(host, port))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for surface in ApiSurface::ALL {
            self.socket_addr(surface)?;

            let path = self.api_path(surface);
            if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
                anyhow::bail!("Invalid {} API path {:?}: expected \"/name\"", surface, path);
            }
            if path == "/health" {
                anyhow::bail!("{} API path collides with the health endpoint", surface);
            }
        }

        if self.server.shop_port != 0 && self.server.shop_port == self.server.admin_port {
            anyhow::bail!(
                "Shop and admin surfaces cannot share port {}",
                self.server.shop_port
            );
        }

        if self.auth.session_secret.is_empty() {
            anyhow::bail!("Session secret must not be empty");
        }
        if self.auth.superadmin_identifier.is_empty() {
            anyhow::bail!("Superadmin identifier must not be empty");
        }

        if let Some(path) = &self.seed.initial_data {
            if !path.exists() {
                anyhow::bail!("Seed file not found: {:?}", path);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.shop_api_path, "/shop-api");
        assert_eq!(config.server.admin_api_path, "/admin-api");
        assert_eq!(config.auth.superadmin_identifier, "superadmin");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("APIARY_HOST", "0.0.0.0");
        std::env::set_var("APIARY_ADMIN_PORT", "9001");

        let config = ServerConfig::from_env();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.admin_port, 9001);

        std::env::remove_var("APIARY_HOST");
        std::env::remove_var("APIARY_ADMIN_PORT");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
shop_port = 0
admin_port = 0
shop_api_path = "/store"

[auth]
session_secret = "from-file"
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.shop_api_path, "/store");
        assert_eq!(config.server.admin_api_path, "/admin-api");
        assert_eq!(config.server.shop_port, 0);
        assert_eq!(config.auth.session_secret, "from-file");
        assert_eq!(config.auth.superadmin_password, "superadmin");
        assert!(config.seed.initial_data.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
shop_api_path = "/store"

[auth]
session_secret = "from-file"
"#
        )
        .unwrap();

        std::env::set_var("APIARY_SESSION_SECRET", "from-env");
        let config = ServerConfig::load(Some(file.path().to_path_buf()));
        std::env::remove_var("APIARY_SESSION_SECRET");

        let config = config.unwrap();
        assert_eq!(config.auth.session_secret, "from-env");
        assert_eq!(config.server.shop_api_path, "/store");
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(Some(dir.path().join("missing.toml"))).unwrap();
        assert_eq!(config.server.shop_api_path, "/shop-api");
    }

    #[test]
    fn test_validate_rejects_bad_paths() {
        let mut config = ServerConfig::default();
        config.server.shop_api_path = "shop".to_string();
        assert!(config.validate().is_err());

        config.server.shop_api_path = "/".to_string();
        assert!(config.validate().is_err());

        config.server.shop_api_path = "/health".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_port_sharing() {
        let mut config = ServerConfig::default();
        config.server.admin_port = config.server.shop_port;
        assert!(config.validate().is_err());

        config.server.shop_port = 0;
        config.server.admin_port = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = ServerConfig::default();
        config.auth.session_secret.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let mut config = ServerConfig::default();
        config.server.admin_port = 0;
        let addr = config.socket_addr(ApiSurface::Admin).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:0");

        config.server.host = "not-an-ip".to_string();
        assert!(config.validate().is_err());
    }
}
