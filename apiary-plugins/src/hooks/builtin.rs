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

//! Built-in plugins.

use super::context::{RequestContext, RequestInfo, ServiceContext};
use super::listener::RequestListener;
use super::plugin::{HookSet, ServerPlugin};
use crate::error::HookError;
use async_trait::async_trait;
use std::time::Instant;

/// Plugin that logs lifecycle events (for debugging).
pub struct LoggingPlugin {
    name: String,
}

impl LoggingPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LoggingPlugin {
    fn default() -> Self {
        Self::new("request-logger")
    }
}

#[async_trait]
impl ServerPlugin for LoggingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> HookSet {
        HookSet::all()
    }

    async fn server_will_start(&self, service: &ServiceContext) -> Result<(), HookError> {
        for (surface, schema) in &service.schema.surfaces {
            tracing::info!(
                plugin = %self.name,
                surface = %surface,
                path = %schema.path,
                root_fields = ?schema.root_fields,
                "Surface composed"
            );
        }
        Ok(())
    }

    async fn request_did_start(
        &self,
        request: &RequestInfo,
    ) -> Result<Option<Box<dyn RequestListener>>, HookError> {
        tracing::info!(
            plugin = %self.name,
            request_id = %request.id(),
            surface = %request.surface(),
            operation = request.operation_name().unwrap_or("<anonymous>"),
            "Request started"
        );
        Ok(Some(Box::new(TimingListener {
            plugin: self.name.clone(),
            started: Instant::now(),
        })))
    }
}

struct TimingListener {
    plugin: String,
    started: Instant,
}

#[async_trait]
impl RequestListener for TimingListener {
    async fn will_send_response(&self, context: &RequestContext) -> Result<(), HookError> {
        let fields: Vec<&str> = context.response().data().keys().map(String::as_str).collect();
        tracing::info!(
            plugin = %self.plugin,
            request_id = %context.request().id(),
            surface = %context.request().surface(),
            fields = ?fields,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            "Sending response"
        );
        Ok(())
    }
}
