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

//! Per-request lifecycle session.

use super::context::{RequestInfo, ResponsePayload};
use super::listener::RequestListener;

/// A listener together with the plugin that produced it.
pub(crate) struct SessionListener {
    pub(crate) plugin: String,
    pub(crate) listener: Box<dyn RequestListener>,
}

/// State owned by the dispatcher for exactly one request.
///
/// Created by `request_did_start` and consumed by `will_send_response`, so the
/// listeners it holds can never outlive their request or be reached from
/// another one.
pub struct RequestLifecycleSession {
    request: RequestInfo,
    pub(crate) listeners: Vec<SessionListener>,
    response: Option<ResponsePayload>,
}

impl RequestLifecycleSession {
    pub(crate) fn new(request: RequestInfo) -> Self {
        Self {
            request,
            listeners: Vec::new(),
            response: None,
        }
    }

    pub(crate) fn push_listener(&mut self, plugin: &str, listener: Box<dyn RequestListener>) {
        self.listeners.push(SessionListener {
            plugin: plugin.to_string(),
            listener,
        });
    }

    pub(crate) fn finalize(&mut self, payload: ResponsePayload) -> ResponsePayload {
        self.response = Some(payload.clone());
        payload
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Number of listeners registered for this request.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Names of plugins that registered a listener, in the order they did so.
    pub fn listener_plugins(&self) -> Vec<&str> {
        self.listeners.iter().map(|l| l.plugin.as_str()).collect()
    }

    /// The finalized payload, once resolution has produced one.
    pub fn response(&self) -> Option<&ResponsePayload> {
        self.response.as_ref()
    }
}

impl std::fmt::Debug for RequestLifecycleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLifecycleSession")
            .field("request_id", &self.request.id())
            .field("surface", &self.request.surface())
            .field("listeners", &self.listener_plugins())
            .field("finalized", &self.response.is_some())
            .finish()
    }
}
