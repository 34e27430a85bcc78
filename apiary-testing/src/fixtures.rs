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

//! Shared configuration and seed data for end-to-end tests.

use apiary_server::config::ServerConfig;
use apiary_server::seed::{SeedData, SeedError};

const INITIAL_DATA: &str = include_str!("../fixtures/e2e-initial-data.json");

/// Server configuration binding both surfaces to ephemeral loopback ports.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.shop_port = 0;
    config.server.admin_port = 0;
    config.auth.session_secret = "apiary-test-secret".to_string();
    config
}

/// The standard catalog: `T_1` "Laptop" through `T_5`, with `T_5` disabled.
pub fn initial_data() -> Result<SeedData, SeedError> {
    SeedData::from_json(INITIAL_DATA)
}
