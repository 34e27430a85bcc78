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

//! Recording plugin for asserting on hook invocations.
//!
//! Each scenario owns an [`InvocationLog`] and hands clones of it to the
//! plugins it registers. Nothing is global, so tests running in parallel
//! never observe each other's calls.

use apiary_plugins::{
    ApiSurface, HookError, HookSet, LifecycleHook, RequestContext, RequestInfo, RequestListener,
    ServerPlugin, ServiceContext,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// A `request_did_start` call as seen by a plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub plugin: String,
    pub request_id: String,
    pub surface: ApiSurface,
    pub operation_name: Option<String>,
}

/// A `will_send_response` call and the payload it observed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResponse {
    pub plugin: String,
    pub request_id: String,
    pub surface: ApiSurface,
    pub operation_name: Option<String>,
    pub data: Value,
}

#[derive(Debug, Default)]
struct LogState {
    services: Vec<(String, ServiceContext)>,
    requests: Vec<RecordedRequest>,
    responses: Vec<RecordedResponse>,
    events: Vec<String>,
}

/// Shared collector of hook invocations.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    state: Arc<Mutex<LogState>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded invocations of a hook, across all plugins.
    pub fn count(&self, hook: LifecycleHook) -> usize {
        let state = self.state.lock();
        match hook {
            LifecycleHook::ServerWillStart => state.services.len(),
            LifecycleHook::RequestDidStart => state.requests.len(),
            LifecycleHook::WillSendResponse => state.responses.len(),
        }
    }

    /// Contexts received by `server_will_start`, with the receiving plugin.
    pub fn service_contexts(&self) -> Vec<(String, ServiceContext)> {
        self.state.lock().services.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn responses(&self) -> Vec<RecordedResponse> {
        self.state.lock().responses.clone()
    }

    /// Every invocation as `plugin:hook`, in the order it happened.
    pub fn events(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    /// Events belonging to one request, in order.
    pub fn events_for(&self, request_id: &str) -> Vec<String> {
        let suffix = format!("@{request_id}");
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_suffix(&suffix).map(str::to_string))
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        *self.state.lock() = LogState::default();
    }

    fn push_event(
        state: &mut LogState,
        plugin: &str,
        hook: LifecycleHook,
        request_id: Option<&str>,
    ) {
        let event = match request_id {
            Some(id) => format!("{plugin}:{hook}@{id}"),
            None => format!("{plugin}:{hook}"),
        };
        state.events.push(event);
    }

    fn record_service(&self, plugin: &str, service: &ServiceContext) {
        let mut state = self.state.lock();
        state.services.push((plugin.to_string(), service.clone()));
        Self::push_event(&mut state, plugin, LifecycleHook::ServerWillStart, None);
    }

    fn record_request(&self, plugin: &str, request: &RequestInfo) {
        let request_id = request.id().to_string();
        let mut state = self.state.lock();
        Self::push_event(
            &mut state,
            plugin,
            LifecycleHook::RequestDidStart,
            Some(&request_id),
        );
        state.requests.push(RecordedRequest {
            plugin: plugin.to_string(),
            request_id,
            surface: request.surface(),
            operation_name: request.operation_name().map(str::to_string),
        });
    }

    fn record_response(&self, plugin: &str, context: &RequestContext) {
        let request = context.request();
        let request_id = request.id().to_string();
        let mut state = self.state.lock();
        Self::push_event(
            &mut state,
            plugin,
            LifecycleHook::WillSendResponse,
            Some(&request_id),
        );
        state.responses.push(RecordedResponse {
            plugin: plugin.to_string(),
            request_id,
            surface: request.surface(),
            operation_name: request.operation_name().map(str::to_string),
            data: context.response().to_value(),
        });
    }
}

/// Plugin recording every hook it declares into an [`InvocationLog`].
pub struct RecordingPlugin {
    name: String,
    hooks: HookSet,
    log: InvocationLog,
    fail_on: Option<LifecycleHook>,
}

impl RecordingPlugin {
    /// A plugin named `recorder` implementing every hook.
    pub fn new(log: &InvocationLog) -> Self {
        Self::named("recorder", log)
    }

    pub fn named(name: impl Into<String>, log: &InvocationLog) -> Self {
        Self {
            name: name.into(),
            hooks: HookSet::all(),
            log: log.clone(),
            fail_on: None,
        }
    }

    /// Restrict the hooks this plugin declares.
    pub fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = hooks;
        self
    }

    /// Record, then fail, whenever `hook` fires.
    pub fn failing_on(mut self, hook: LifecycleHook) -> Self {
        self.fail_on = Some(hook);
        self
    }

    fn outcome(&self, hook: LifecycleHook) -> Result<(), HookError> {
        if self.fail_on == Some(hook) {
            return Err(HookError::failed(format!("{} refused {hook}", self.name)));
        }
        Ok(())
    }
}

#[async_trait]
impl ServerPlugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> HookSet {
        self.hooks
    }

    async fn server_will_start(&self, service: &ServiceContext) -> Result<(), HookError> {
        self.log.record_service(&self.name, service);
        self.outcome(LifecycleHook::ServerWillStart)
    }

    async fn request_did_start(
        &self,
        request: &RequestInfo,
    ) -> Result<Option<Box<dyn RequestListener>>, HookError> {
        self.log.record_request(&self.name, request);
        self.outcome(LifecycleHook::RequestDidStart)?;

        if !self.hooks.contains(LifecycleHook::WillSendResponse) {
            return Ok(None);
        }
        Ok(Some(Box::new(RecordingListener {
            plugin: self.name.clone(),
            log: self.log.clone(),
            fail: self.fail_on == Some(LifecycleHook::WillSendResponse),
        })))
    }
}

struct RecordingListener {
    plugin: String,
    log: InvocationLog,
    fail: bool,
}

#[async_trait]
impl RequestListener for RecordingListener {
    async fn will_send_response(&self, context: &RequestContext) -> Result<(), HookError> {
        self.log.record_response(&self.plugin, context);
        if self.fail {
            return Err(HookError::failed(format!(
                "{} refused {}",
                self.plugin,
                LifecycleHook::WillSendResponse
            )));
        }
        Ok(())
    }
}
