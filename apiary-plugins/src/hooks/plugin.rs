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

//! The plugin contract: extension points and the trait plugins implement.

use super::context::{RequestInfo, ServiceContext};
use super::listener::RequestListener;
use crate::error::HookError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Extension points exposed by the server lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleHook {
    /// Fired once, after services are composed and before any request is accepted.
    ServerWillStart,
    /// Fired once per inbound request, before resolution begins.
    RequestDidStart,
    /// Fired once per request listener, after resolution and before transmission.
    WillSendResponse,
}

impl LifecycleHook {
    pub const ALL: [LifecycleHook; 3] = [
        LifecycleHook::ServerWillStart,
        LifecycleHook::RequestDidStart,
        LifecycleHook::WillSendResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleHook::ServerWillStart => "serverWillStart",
            LifecycleHook::RequestDidStart => "requestDidStart",
            LifecycleHook::WillSendResponse => "willSendResponse",
        }
    }

    fn bit(self) -> u8 {
        match self {
            LifecycleHook::ServerWillStart => 0b001,
            LifecycleHook::RequestDidStart => 0b010,
            LifecycleHook::WillSendResponse => 0b100,
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of hooks a plugin (or a request listener) implements.
///
/// The dispatcher only invokes a hook when its owner declares it here, so a
/// plugin that declares nothing is never called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HookSet {
    bits: u8,
}

impl HookSet {
    /// A set containing no hooks.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// A set containing every hook.
    pub const fn all() -> Self {
        Self { bits: 0b111 }
    }

    /// Add a hook to the set.
    pub fn with(mut self, hook: LifecycleHook) -> Self {
        self.bits |= hook.bit();
        self
    }

    /// Remove a hook from the set.
    pub fn without(mut self, hook: LifecycleHook) -> Self {
        self.bits &= !hook.bit();
        self
    }

    pub fn contains(&self, hook: LifecycleHook) -> bool {
        self.bits & hook.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate over the hooks in the set, in lifecycle order.
    pub fn iter(&self) -> impl Iterator<Item = LifecycleHook> + '_ {
        LifecycleHook::ALL
            .into_iter()
            .filter(move |hook| self.contains(*hook))
    }
}

impl From<LifecycleHook> for HookSet {
    fn from(hook: LifecycleHook) -> Self {
        HookSet::empty().with(hook)
    }
}

impl FromIterator<LifecycleHook> for HookSet {
    fn from_iter<I: IntoIterator<Item = LifecycleHook>>(iter: I) -> Self {
        iter.into_iter().fold(HookSet::empty(), HookSet::with)
    }
}

/// A plugin observing the server and request lifecycle.
///
/// Every hook is optional. A plugin advertises the hooks it implements through
/// [`ServerPlugin::hooks`]; the default bodies are no-ops so a plugin only
/// overrides what it declares.
///
/// # Example
///
/// ```rust,ignore
/// struct AuditPlugin;
///
/// #[async_trait]
/// impl ServerPlugin for AuditPlugin {
///     fn name(&self) -> &str {
///         "audit"
///     }
///
///     fn hooks(&self) -> HookSet {
///         HookSet::from(LifecycleHook::RequestDidStart)
///     }
///
///     async fn request_did_start(
///         &self,
///         request: &RequestInfo,
///     ) -> Result<Option<Box<dyn RequestListener>>, HookError> {
///         tracing::info!(request_id = %request.id(), "request started");
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait ServerPlugin: Send + Sync {
    /// Unique plugin name within one registration.
    fn name(&self) -> &str;

    /// Hooks this plugin implements.
    fn hooks(&self) -> HookSet {
        HookSet::empty()
    }

    /// Called once after services are composed. A failure aborts startup.
    async fn server_will_start(&self, _service: &ServiceContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once per request before resolution.
    ///
    /// Returning a listener scopes further hooks to this single request.
    async fn request_did_start(
        &self,
        _request: &RequestInfo,
    ) -> Result<Option<Box<dyn RequestListener>>, HookError> {
        Ok(None)
    }
}

/// Type alias for a shared plugin instance.
pub type SharedPlugin = Arc<dyn ServerPlugin>;
