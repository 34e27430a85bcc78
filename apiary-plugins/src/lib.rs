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

//! Apiary Plugin System
//!
//! Lets externally registered plugins attach behavior to the lifecycle of an
//! Apiary API server without touching its request handling.
//!
//! # Features
//!
//! - **Optional hooks**: a plugin implements any subset of the lifecycle hooks
//! - **Deterministic ordering**: hooks fire in registration order, one at a time
//! - **Per-request sessions**: listener state is scoped to exactly one request
//! - **Read-only payloads**: listeners observe the exact value that is transmitted

pub mod error;
pub mod hooks;

// Re-exports
pub use error::{HookError, HookResult};
pub use hooks::{
    ApiSurface, CallbackListener, DispatchError, HookSet, LifecycleDispatcher, LifecycleHook,
    LoggingPlugin, PluginRegistration, RegistryError, RequestContext, RequestError,
    RequestInfo, RequestLifecycleSession, RequestListener, ResponsePayload, SchemaDescriptor,
    ServerPlugin, ServiceContext, SharedPlugin, StartupReport, SurfaceSchema,
};
