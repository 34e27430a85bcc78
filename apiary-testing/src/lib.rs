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

//! # Apiary Testing
//!
//! End-to-end harness for Apiary servers: start a real server on ephemeral
//! ports, drive both surfaces over HTTP and assert on the hooks plugins saw.
//!
//! ```rust,ignore
//! let log = InvocationLog::new();
//! let env = TestEnvironment::init(
//!     fixtures::test_config(),
//!     [Arc::new(RecordingPlugin::new(&log)) as SharedPlugin],
//!     InitOptions::new(fixtures::initial_data()?),
//! )
//! .await?;
//!
//! env.shop_client().query(r#"{ product(id: "T_1") { id name } }"#).await?;
//! assert_eq!(log.count(LifecycleHook::WillSendResponse), 1);
//! env.destroy().await;
//! ```

pub mod client;
pub mod environment;
pub mod error;
pub mod fixtures;
pub mod recorder;

pub use client::{AdminClient, GraphQlError, GraphQlResponse, ShopClient};
pub use environment::{InitOptions, TestEnvironment};
pub use error::{ClientError, SetupError};
pub use recorder::{InvocationLog, RecordedRequest, RecordedResponse, RecordingPlugin};
