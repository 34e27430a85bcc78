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

//! Lifecycle dispatcher fanning server and request events out to plugins.

use super::context::{RequestContext, RequestInfo, ResponsePayload, ServiceContext};
use super::plugin::{LifecycleHook, SharedPlugin};
use super::registry::PluginRegistration;
use super::session::RequestLifecycleSession;
use crate::error::HookError;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// A plugin hook failed while being dispatched.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Plugin '{plugin}' failed in {hook}: {source}")]
    HookFailed {
        plugin: String,
        hook: LifecycleHook,
        #[source]
        source: HookError,
    },
}

impl DispatchError {
    fn hook_failed(plugin: &str, hook: LifecycleHook, source: HookError) -> Self {
        DispatchError::HookFailed {
            plugin: plugin.to_string(),
            hook,
            source,
        }
    }

    /// Name of the plugin whose hook failed.
    pub fn plugin(&self) -> &str {
        match self {
            DispatchError::HookFailed { plugin, .. } => plugin,
        }
    }

    /// The hook that failed.
    pub fn hook(&self) -> LifecycleHook {
        match self {
            DispatchError::HookFailed { hook, .. } => *hook,
        }
    }
}

/// Failure of a single request: either a plugin hook or the resolution engine.
#[derive(Debug, Error)]
pub enum RequestError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Hook(#[from] DispatchError),

    #[error(transparent)]
    Resolution(E),
}

/// Outcome of the startup dispatch.
#[derive(Debug, Clone)]
pub struct StartupReport {
    /// Plugins whose `server_will_start` ran, in order.
    pub plugins_started: Vec<String>,
    /// Total dispatch time in microseconds.
    pub total_time_us: u64,
}

/// Dispatcher for the server and request lifecycle.
///
/// # Concurrency Model
///
/// The plugin list is frozen at construction and shared read-only, so one
/// dispatcher can serve any number of concurrent requests without locking.
/// Within one event, hooks run sequentially in registration order and each is
/// awaited before the next starts. Nothing is ordered across requests: a slow
/// hook only delays its own request. No timeouts are applied.
pub struct LifecycleDispatcher {
    plugins: Arc<[SharedPlugin]>,
}

impl LifecycleDispatcher {
    /// Create a dispatcher owning the given registration.
    pub fn new(registration: PluginRegistration) -> Self {
        Self {
            plugins: registration.freeze(),
        }
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Registered plugin names, in registration order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    fn implementing(&self, hook: LifecycleHook) -> impl Iterator<Item = &SharedPlugin> {
        self.plugins.iter().filter(move |p| p.hooks().contains(hook))
    }

    /// Fire `server_will_start` on every plugin declaring it.
    ///
    /// Stops at the first failure; later plugins are not started.
    pub async fn server_will_start(
        &self,
        service: &ServiceContext,
    ) -> Result<StartupReport, DispatchError> {
        let start = Instant::now();
        let mut plugins_started = Vec::new();

        for plugin in self.implementing(LifecycleHook::ServerWillStart) {
            tracing::debug!(plugin = %plugin.name(), "Dispatching serverWillStart");

            if let Err(source) = plugin.server_will_start(service).await {
                tracing::error!(
                    plugin = %plugin.name(),
                    error = %source,
                    "serverWillStart failed, aborting startup"
                );
                return Err(DispatchError::hook_failed(
                    plugin.name(),
                    LifecycleHook::ServerWillStart,
                    source,
                ));
            }
            plugins_started.push(plugin.name().to_string());
        }

        let total_time_us = start.elapsed().as_micros() as u64;
        tracing::debug!(
            started = plugins_started.len(),
            total_time_us = total_time_us,
            "serverWillStart dispatch completed"
        );

        Ok(StartupReport {
            plugins_started,
            total_time_us,
        })
    }

    /// Open a lifecycle session for a request and fire `request_did_start`.
    ///
    /// Listeners are collected in registration order. A failing hook aborts the
    /// request and drops any listeners collected so far.
    pub async fn request_did_start(
        &self,
        request: RequestInfo,
    ) -> Result<RequestLifecycleSession, DispatchError> {
        let mut session = RequestLifecycleSession::new(request);

        for plugin in self.implementing(LifecycleHook::RequestDidStart) {
            let outcome = plugin.request_did_start(session.request()).await;
            match outcome {
                Ok(Some(listener)) => session.push_listener(plugin.name(), listener),
                Ok(None) => {}
                Err(source) => {
                    tracing::warn!(
                        plugin = %plugin.name(),
                        request_id = %session.request().id(),
                        error = %source,
                        "requestDidStart failed"
                    );
                    return Err(DispatchError::hook_failed(
                        plugin.name(),
                        LifecycleHook::RequestDidStart,
                        source,
                    ));
                }
            }
        }

        tracing::debug!(
            request_id = %session.request().id(),
            surface = %session.request().surface(),
            listeners = session.listener_count(),
            "Request lifecycle session opened"
        );

        Ok(session)
    }

    /// Fire `will_send_response` on the session's listeners and close it.
    ///
    /// Returns the payload to transmit. Listeners only get a shared view of it,
    /// so the returned value is exactly what they observed.
    pub async fn will_send_response(
        &self,
        mut session: RequestLifecycleSession,
        payload: ResponsePayload,
    ) -> Result<ResponsePayload, DispatchError> {
        let payload = session.finalize(payload);
        let context = RequestContext::new(session.request().clone(), payload.clone());

        for entry in &session.listeners {
            if !entry.listener.hooks().contains(LifecycleHook::WillSendResponse) {
                continue;
            }
            if let Err(source) = entry.listener.will_send_response(&context).await {
                tracing::warn!(
                    plugin = %entry.plugin,
                    request_id = %context.request().id(),
                    error = %source,
                    "willSendResponse failed"
                );
                return Err(DispatchError::hook_failed(
                    &entry.plugin,
                    LifecycleHook::WillSendResponse,
                    source,
                ));
            }
        }

        Ok(payload)
    }

    /// Run one request through the full lifecycle.
    ///
    /// `resolution` is not polled until every `request_did_start` hook has
    /// settled. If it fails, `will_send_response` is skipped.
    pub async fn execute<Fut, E>(
        &self,
        request: RequestInfo,
        resolution: Fut,
    ) -> Result<ResponsePayload, RequestError<E>>
    where
        Fut: Future<Output = Result<ResponsePayload, E>>,
        E: std::error::Error + 'static,
    {
        let session = self.request_did_start(request).await?;

        let payload = match resolution.await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(
                    request_id = %session.request().id(),
                    error = %e,
                    "Resolution failed, skipping willSendResponse"
                );
                return Err(RequestError::Resolution(e));
            }
        };

        Ok(self.will_send_response(session, payload).await?)
    }
}

impl std::fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleDispatcher")
            .field("plugins", &self.plugin_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::context::ApiSurface;
    use super::super::listener::{CallbackListener, RequestListener};
    use super::super::plugin::{HookSet, ServerPlugin};
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    #[derive(Debug, thiserror::Error)]
    #[error("resolution failed: {0}")]
    struct TestResolutionError(String);

    type EventLog = Arc<Mutex<Vec<String>>>;

    /// Plugin recording every hook it receives into a shared log.
    struct Observer {
        name: String,
        hooks: HookSet,
        log: EventLog,
        fail_on: Option<LifecycleHook>,
        gate: Option<Arc<Notify>>,
    }

    impl Observer {
        fn new(name: &str, log: &EventLog) -> Self {
            Self {
                name: name.to_string(),
                hooks: HookSet::all(),
                log: log.clone(),
                fail_on: None,
                gate: None,
            }
        }

        fn with_hooks(mut self, hooks: HookSet) -> Self {
            self.hooks = hooks;
            self
        }

        fn failing_on(mut self, hook: LifecycleHook) -> Self {
            self.fail_on = Some(hook);
            self
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn record(&self, hook: LifecycleHook) -> Result<(), HookError> {
            self.log.lock().push(format!("{}:{}", self.name, hook));
            if self.fail_on == Some(hook) {
                return Err(HookError::failed(format!("{} refused", self.name)));
            }
            Ok(())
        }
    }

    struct ObserverListener {
        name: String,
        log: EventLog,
        fail: bool,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl RequestListener for ObserverListener {
        async fn will_send_response(&self, context: &RequestContext) -> Result<(), HookError> {
            if let Some(gate) = &self.gate {
                if context.request().document().contains("slow") {
                    gate.notified().await;
                }
            }
            self.log
                .lock()
                .push(format!("{}:{}", self.name, LifecycleHook::WillSendResponse));
            if self.fail {
                return Err(HookError::failed(format!("{} refused", self.name)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ServerPlugin for Observer {
        fn name(&self) -> &str {
            &self.name
        }

        fn hooks(&self) -> HookSet {
            self.hooks
        }

        async fn server_will_start(&self, _service: &ServiceContext) -> Result<(), HookError> {
            self.record(LifecycleHook::ServerWillStart)
        }

        async fn request_did_start(
            &self,
            _request: &RequestInfo,
        ) -> Result<Option<Box<dyn RequestListener>>, HookError> {
            self.record(LifecycleHook::RequestDidStart)?;
            Ok(Some(Box::new(ObserverListener {
                name: self.name.clone(),
                log: self.log.clone(),
                fail: self.fail_on == Some(LifecycleHook::WillSendResponse),
                gate: self.gate.clone(),
            })))
        }
    }

    fn service() -> ServiceContext {
        ServiceContext::new(Default::default(), vec![])
    }

    fn request(document: &str) -> RequestInfo {
        RequestInfo::new(ApiSurface::Shop, None, document)
    }

    fn payload() -> ResponsePayload {
        let Value::Object(map) = json!({"product": {"id": "T_1", "name": "Laptop"}}) else {
            unreachable!()
        };
        ResponsePayload::new(map)
    }

    fn dispatcher(plugins: Vec<Observer>) -> LifecycleDispatcher {
        let mut registration = PluginRegistration::new();
        for plugin in plugins {
            registration.register(plugin).unwrap();
        }
        LifecycleDispatcher::new(registration)
    }

    async fn resolve_ok() -> Result<ResponsePayload, TestResolutionError> {
        Ok(payload())
    }

    #[tokio::test]
    async fn test_server_will_start_in_registration_order() {
        let log = EventLog::default();
        let dispatcher = dispatcher(vec![
            Observer::new("b", &log),
            Observer::new("a", &log),
            Observer::new("c", &log),
        ]);

        let report = dispatcher.server_will_start(&service()).await.unwrap();

        assert_eq!(report.plugins_started, vec!["b", "a", "c"]);
        assert_eq!(
            log.lock().as_slice(),
            &["b:serverWillStart", "a:serverWillStart", "c:serverWillStart"]
        );
    }

    #[tokio::test]
    async fn test_startup_failure_stops_later_plugins() {
        let log = EventLog::default();
        let dispatcher = dispatcher(vec![
            Observer::new("first", &log),
            Observer::new("broken", &log).failing_on(LifecycleHook::ServerWillStart),
            Observer::new("never", &log),
        ]);

        let err = dispatcher.server_will_start(&service()).await.unwrap_err();

        assert_eq!(err.plugin(), "broken");
        assert_eq!(err.hook(), LifecycleHook::ServerWillStart);
        assert_eq!(
            log.lock().as_slice(),
            &["first:serverWillStart", "broken:serverWillStart"]
        );
    }

    #[tokio::test]
    async fn test_plugin_without_hooks_is_never_called() {
        let log = EventLog::default();
        let inert = Observer::new("inert", &log).with_hooks(HookSet::empty());
        let dispatcher = dispatcher(vec![inert]);

        dispatcher.server_will_start(&service()).await.unwrap();
        let payload = dispatcher
            .execute(request("{ product }"), resolve_ok())
            .await
            .unwrap();

        assert!(log.lock().is_empty());
        assert_eq!(payload.len(), 1);
    }

    #[tokio::test]
    async fn test_request_hooks_fire_once_in_order() {
        let log = EventLog::default();
        let dispatcher = dispatcher(vec![Observer::new("a", &log), Observer::new("b", &log)]);

        dispatcher
            .execute(request("{ product }"), resolve_ok())
            .await
            .unwrap();

        assert_eq!(
            log.lock().as_slice(),
            &[
                "a:requestDidStart",
                "b:requestDidStart",
                "a:willSendResponse",
                "b:willSendResponse",
            ]
        );
    }

    #[tokio::test]
    async fn test_listener_observes_transmitted_payload() {
        struct Capture(Arc<Mutex<Option<ResponsePayload>>>);

        #[async_trait]
        impl ServerPlugin for Capture {
            fn name(&self) -> &str {
                "capture"
            }

            fn hooks(&self) -> HookSet {
                HookSet::from(LifecycleHook::RequestDidStart)
            }

            async fn request_did_start(
                &self,
                _request: &RequestInfo,
            ) -> Result<Option<Box<dyn RequestListener>>, HookError> {
                let slot = self.0.clone();
                Ok(Some(Box::new(CallbackListener::new(move |ctx| {
                    *slot.lock() = Some(ctx.response().clone());
                    Ok(())
                }))))
            }
        }

        let seen = Arc::new(Mutex::new(None));
        let registration = PluginRegistration::new()
            .with(Capture(seen.clone()))
            .unwrap();
        let dispatcher = LifecycleDispatcher::new(registration);

        let sent = dispatcher
            .execute(request("{ product }"), resolve_ok())
            .await
            .unwrap();

        let observed = seen.lock().clone().unwrap();
        assert!(observed.ptr_eq(&sent));
        assert_eq!(observed.to_value(), json!({"product": {"id": "T_1", "name": "Laptop"}}));
    }

    #[tokio::test]
    async fn test_resolution_failure_skips_will_send_response() {
        let log = EventLog::default();
        let dispatcher = dispatcher(vec![Observer::new("a", &log)]);

        let result = dispatcher
            .execute(request("{ nope }"), async {
                Err::<ResponsePayload, _>(TestResolutionError("unknown field".into()))
            })
            .await;

        assert!(matches!(result, Err(RequestError::Resolution(_))));
        assert_eq!(log.lock().as_slice(), &["a:requestDidStart"]);
    }

    #[tokio::test]
    async fn test_request_did_start_failure_never_resolves() {
        let log = EventLog::default();
        let dispatcher = dispatcher(vec![
            Observer::new("broken", &log).failing_on(LifecycleHook::RequestDidStart),
            Observer::new("later", &log),
        ]);
        let resolved = AtomicBool::new(false);

        let result = dispatcher
            .execute(request("{ product }"), async {
                resolved.store(true, Ordering::SeqCst);
                resolve_ok().await
            })
            .await;

        match result {
            Err(RequestError::Hook(err)) => {
                assert_eq!(err.plugin(), "broken");
                assert_eq!(err.hook(), LifecycleHook::RequestDidStart);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!resolved.load(Ordering::SeqCst));
        assert_eq!(log.lock().as_slice(), &["broken:requestDidStart"]);
    }

    #[tokio::test]
    async fn test_will_send_response_failure_is_fail_fast() {
        let log = EventLog::default();
        let dispatcher = dispatcher(vec![
            Observer::new("a", &log).failing_on(LifecycleHook::WillSendResponse),
            Observer::new("b", &log),
        ]);

        let result = dispatcher
            .execute(request("{ product }"), resolve_ok())
            .await;

        let Err(RequestError::Hook(err)) = result else {
            panic!("expected hook failure");
        };
        assert_eq!(err.plugin(), "a");
        assert_eq!(err.hook(), LifecycleHook::WillSendResponse);
        assert_eq!(
            log.lock().as_slice(),
            &["a:requestDidStart", "b:requestDidStart", "a:willSendResponse"]
        );
    }

    #[tokio::test]
    async fn test_slow_listener_does_not_block_other_requests() {
        let log = EventLog::default();
        let gate = Arc::new(Notify::new());
        let dispatcher = Arc::new(dispatcher(vec![Observer::new("p", &log).gated(gate.clone())]));

        let slow = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .execute(request("{ slow }"), resolve_ok())
                    .await
                    .map(|p| p.len())
                    .map_err(|e| e.to_string())
            })
        };

        // Let the slow request reach its listener.
        while !log.lock().iter().any(|e| e == "p:requestDidStart") {
            tokio::task::yield_now().await;
        }

        dispatcher
            .execute(request("{ fast }"), resolve_ok())
            .await
            .unwrap();
        assert!(!slow.is_finished());

        gate.notify_one();
        assert_eq!(slow.await.unwrap().unwrap(), 1);
        assert_eq!(
            log.lock()
                .iter()
                .filter(|e| e.ends_with("willSendResponse"))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_session_tracks_listeners() {
        let log = EventLog::default();
        let dispatcher = dispatcher(vec![
            Observer::new("a", &log),
            Observer::new("quiet", &log).with_hooks(HookSet::from(LifecycleHook::ServerWillStart)),
            Observer::new("b", &log),
        ]);

        let session = dispatcher.request_did_start(request("{ x }")).await.unwrap();
        assert_eq!(session.listener_plugins(), vec!["a", "b"]);
        assert!(session.response().is_none());

        let Value::Object(map) = json!({"x": 1}) else {
            unreachable!()
        };
        let sent = dispatcher
            .will_send_response(session, ResponsePayload::new(map))
            .await
            .unwrap();
        assert_eq!(sent.get("x"), Some(&json!(1)));
    }

    proptest! {
        #[test]
        fn prop_each_plugin_fires_exactly_once_per_request(
            count in 1usize..12,
            requests in 1usize..4,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let log = EventLog::default();
            let names: Vec<String> = (0..count).map(|i| format!("p{i}")).collect();
            let dispatcher = dispatcher(names.iter().map(|n| Observer::new(n, &log)).collect());

            runtime.block_on(async {
                dispatcher.server_will_start(&service()).await.unwrap();
                for _ in 0..requests {
                    dispatcher.execute(request("{ product }"), resolve_ok()).await.unwrap();
                }
            });

            let events = log.lock().clone();
            prop_assert_eq!(events.len(), count + 2 * count * requests);

            let starts: Vec<_> = events[..count].to_vec();
            let expected: Vec<_> = names.iter().map(|n| format!("{n}:serverWillStart")).collect();
            prop_assert_eq!(starts, expected);

            for chunk in events[count..].chunks(2 * count) {
                let (did_start, will_send) = chunk.split_at(count);
                for (i, name) in names.iter().enumerate() {
                    prop_assert_eq!(&did_start[i], &format!("{name}:requestDidStart"));
                    prop_assert_eq!(&will_send[i], &format!("{name}:willSendResponse"));
                }
            }
        }
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::hook_failed(
            "audit",
            LifecycleHook::WillSendResponse,
            HookError::failed("boom"),
        );
        assert_eq!(
            err.to_string(),
            "Plugin 'audit' failed in willSendResponse: Hook execution failed: boom"
        );
    }
}
