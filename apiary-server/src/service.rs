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

//! Service composition.

use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::schema::ResolutionEngine;
use apiary_plugins::{ApiSurface, SchemaDescriptor, ServiceContext, SurfaceSchema};

/// Compose the schema of both surfaces into the context handed to
/// `server_will_start`.
///
/// Fails when a surface would expose no root fields.
pub fn compose_services(
    config: &ServerConfig,
    engine: &dyn ResolutionEngine,
    plugins: Vec<String>,
) -> Result<ServiceContext, StartupError> {
    let mut schema = SchemaDescriptor::new();

    for surface in ApiSurface::ALL {
        let root_fields = engine.root_fields(surface);
        if root_fields.is_empty() {
            return Err(StartupError::Composition(format!(
                "{surface} API exposes no query fields"
            )));
        }

        schema = schema.with_surface(
            surface,
            SurfaceSchema {
                path: config.api_path(surface).to_string(),
                root_fields,
            },
        );
    }

    tracing::debug!(surfaces = schema.surfaces.len(), plugins = plugins.len(), "Services composed");
    Ok(ServiceContext::new(schema, plugins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CatalogEngine, CatalogStore, Document, ResolutionError};
    use apiary_plugins::ResponsePayload;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EmptyEngine;

    #[async_trait]
    impl ResolutionEngine for EmptyEngine {
        fn root_fields(&self, surface: ApiSurface) -> Vec<String> {
            match surface {
                ApiSurface::Shop => vec!["products".to_string()],
                ApiSurface::Admin => Vec::new(),
            }
        }

        async fn resolve(
            &self,
            _document: &Document,
            _surface: ApiSurface,
        ) -> Result<ResponsePayload, ResolutionError> {
            Ok(ResponsePayload::new(Default::default()))
        }
    }

    #[test]
    fn test_compose_describes_both_surfaces() {
        let engine = CatalogEngine::new(Arc::new(CatalogStore::new()));
        let service =
            compose_services(&ServerConfig::default(), &engine, vec!["audit".to_string()]).unwrap();

        let shop = service.schema.surface(ApiSurface::Shop).unwrap();
        assert_eq!(shop.path, "/shop-api");
        assert!(!shop.root_fields.contains(&"administrators".to_string()));

        let admin = service.schema.surface(ApiSurface::Admin).unwrap();
        assert_eq!(admin.path, "/admin-api");
        assert!(admin.root_fields.contains(&"administrators".to_string()));
        assert_eq!(service.plugins, vec!["audit"]);
    }

    #[test]
    fn test_empty_surface_fails_composition() {
        let err = compose_services(&ServerConfig::default(), &EmptyEngine, vec![]).unwrap_err();
        assert!(matches!(err, StartupError::Composition(_)));
    }
}
