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

//! Context values handed to plugin hooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The API surface a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiSurface {
    /// Public storefront surface.
    Shop,
    /// Privileged administrative surface.
    Admin,
}

impl ApiSurface {
    pub const ALL: [ApiSurface; 2] = [ApiSurface::Shop, ApiSurface::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiSurface::Shop => "shop",
            ApiSurface::Admin => "admin",
        }
    }

    /// Whether requests on this surface require an authenticated session.
    pub fn is_privileged(&self) -> bool {
        matches!(self, ApiSurface::Admin)
    }
}

impl fmt::Display for ApiSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root fields exposed by one surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSchema {
    /// HTTP path the surface is mounted on.
    pub path: String,
    /// Query root fields visible on this surface.
    pub root_fields: Vec<String>,
}

/// Description of the composed schema across both surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub surfaces: BTreeMap<ApiSurface, SurfaceSchema>,
}

impl SchemaDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface(mut self, surface: ApiSurface, schema: SurfaceSchema) -> Self {
        self.surfaces.insert(surface, schema);
        self
    }

    pub fn surface(&self, surface: ApiSurface) -> Option<&SurfaceSchema> {
        self.surfaces.get(&surface)
    }
}

/// Read-only context passed to `server_will_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceContext {
    /// Composed schema.
    pub schema: SchemaDescriptor,
    /// Registered plugin names, in registration order.
    pub plugins: Vec<String>,
    /// When composition finished.
    pub composed_at: DateTime<Utc>,
}

impl ServiceContext {
    pub fn new(schema: SchemaDescriptor, plugins: Vec<String>) -> Self {
        Self {
            schema,
            plugins,
            composed_at: Utc::now(),
        }
    }
}

/// Metadata about one inbound request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    id: Uuid,
    surface: ApiSurface,
    operation_name: Option<String>,
    document: Arc<str>,
    received_at: DateTime<Utc>,
}

impl RequestInfo {
    pub fn new(
        surface: ApiSurface,
        operation_name: Option<String>,
        document: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            surface,
            operation_name,
            document: document.into(),
            received_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn surface(&self) -> ApiSurface {
        self.surface
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// The raw query document.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// Resolved result data for one request, keyed by top-level field name.
///
/// The payload is immutable once built. Clones share the same underlying map,
/// so the value a listener sees is the value that gets serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePayload {
    data: Arc<Map<String, Value>>,
}

impl ResponsePayload {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    /// Top-level fields of the payload.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Owned deep copy as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.data.as_ref().clone())
    }

    /// Whether two payloads share the same underlying data.
    pub fn ptr_eq(&self, other: &ResponsePayload) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Serialize for ResponsePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.as_ref().serialize(serializer)
    }
}

impl From<Map<String, Value>> for ResponsePayload {
    fn from(data: Map<String, Value>) -> Self {
        Self::new(data)
    }
}

/// Read-only context passed to `will_send_response`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: RequestInfo,
    response: ResponsePayload,
}

impl RequestContext {
    pub(crate) fn new(request: RequestInfo, response: ResponsePayload) -> Self {
        Self { request, response }
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// The finalized response payload.
    pub fn response(&self) -> &ResponsePayload {
        &self.response
    }
}
