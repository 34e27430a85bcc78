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
use apiary_server::{config::ServerConfig, run_server};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host (overrides config file)
    #[arg(long, env = "APIARY_HOST")]
    host: Option<String>,

    /// Shop API port, 0 for ephemeral (overrides config file)
    #[arg(long, env = "APIARY_SHOP_PORT")]
    shop_port: Option<u16>,

    /// Admin API port, 0 for ephemeral (overrides config file)
    #[arg(long, env = "APIARY_ADMIN_PORT")]
    admin_port: Option<u16>,

    /// JSON seed data provisioned at startup
    #[arg(long, env = "APIARY_SEED_PATH")]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ServerConfig::load(args.config)?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.shop_port {
        config.server.shop_port = port;
    }
    if let Some(port) = args.admin_port {
        config.server.admin_port = port;
    }
    if let Some(seed) = args.seed {
        config.seed.initial_data = Some(seed);
    }

    // Run server
    run_server(config).await
}
