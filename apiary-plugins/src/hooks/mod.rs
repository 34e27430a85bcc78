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

//! Request Lifecycle Hooks
//!
//! Plugins observe three points in the life of an API server:
//!
//! - **serverWillStart**: once, after services are composed and before any request
//! - **requestDidStart**: once per request, before resolution; may return a listener
//! - **willSendResponse**: once per listener, with the finalized payload, before transmission
//!
//! # Architecture
//!
//! - Plugins declare the hooks they implement through a [`HookSet`]
//! - One [`LifecycleDispatcher`] owns the frozen plugin list and is shared by every surface
//! - Each request gets its own [`RequestLifecycleSession`] holding its listeners
//! - Hooks of one event run sequentially in registration order
//!
//! # Example
//!
//! ```rust,ignore
//! use apiary_plugins::hooks::{
//!     LifecycleDispatcher, LoggingPlugin, PluginRegistration, RequestInfo,
//! };
//!
//! let registration = PluginRegistration::new().with(LoggingPlugin::default())?;
//! let dispatcher = LifecycleDispatcher::new(registration);
//!
//! dispatcher.server_will_start(&service).await?;
//! let payload = dispatcher
//!     .execute(RequestInfo::new(surface, None, query), engine.resolve(&document, surface))
//!     .await?;
//! ```

mod builtin;
mod context;
mod dispatcher;
mod listener;
mod plugin;
mod registry;
mod session;

pub use builtin::LoggingPlugin;
pub use context::{
    ApiSurface, RequestContext, RequestInfo, ResponsePayload, SchemaDescriptor, ServiceContext,
    SurfaceSchema,
};
pub use dispatcher::{DispatchError, LifecycleDispatcher, RequestError, StartupReport};
pub use listener::{CallbackListener, RequestListener};
pub use plugin::{HookSet, LifecycleHook, ServerPlugin, SharedPlugin};
pub use registry::{PluginRegistration, RegistryError};
pub use session::RequestLifecycleSession;
