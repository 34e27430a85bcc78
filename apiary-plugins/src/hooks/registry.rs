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

//! Ordered plugin registration.

use super::plugin::{LifecycleHook, ServerPlugin, SharedPlugin};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building a registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Plugin already registered: {0}")]
    DuplicatePlugin(String),

    #[error("Plugin name must not be empty")]
    EmptyName,
}

/// Ordered list of plugins for one server instance.
///
/// Registration order is the order hooks fire in. The list is consumed when
/// the dispatcher is built and cannot change afterwards.
#[derive(Clone, Default)]
pub struct PluginRegistration {
    plugins: Vec<SharedPlugin>,
}

impl PluginRegistration {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Register a plugin at the end of the list.
    pub fn register(&mut self, plugin: impl ServerPlugin + 'static) -> Result<(), RegistryError> {
        self.register_shared(Arc::new(plugin))
    }

    /// Register an already shared plugin instance.
    pub fn register_shared(&mut self, plugin: SharedPlugin) -> Result<(), RegistryError> {
        let name = plugin.name();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.plugins.iter().any(|p| p.name() == name) {
            return Err(RegistryError::DuplicatePlugin(name.to_string()));
        }
        self.plugins.push(plugin);
        Ok(())
    }

    /// Builder-style [`PluginRegistration::register`].
    pub fn with(mut self, plugin: impl ServerPlugin + 'static) -> Result<Self, RegistryError> {
        self.register(plugin)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// Plugins declaring the given hook, in registration order.
    pub fn implementing(&self, hook: LifecycleHook) -> impl Iterator<Item = &SharedPlugin> {
        self.plugins.iter().filter(move |p| p.hooks().contains(hook))
    }

    pub(crate) fn freeze(self) -> Arc<[SharedPlugin]> {
        self.plugins.into()
    }
}

impl std::fmt::Debug for PluginRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistration")
            .field("plugins", &self.names())
            .finish()
    }
}
