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

//! Resolution engine boundary and the catalog-backed implementation.

use super::catalog::{Administrator, CatalogStore, Product};
use super::document::{Document, DocumentError, Selection};
use apiary_plugins::{ApiSurface, ResponsePayload};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Query resolution failed.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    Syntax(#[from] DocumentError),

    #[error("Cannot query field \"{field}\" on type \"{type_name}\"")]
    UnknownField { type_name: String, field: String },

    #[error("Unknown argument \"{argument}\" on field \"{field}\"")]
    UnknownArgument { field: String, argument: String },

    #[error("Field \"{field}\" requires argument \"{argument}\"")]
    MissingArgument { field: String, argument: String },

    #[error("Invalid value for argument \"{argument}\" on field \"{field}\": {reason}")]
    InvalidArgument {
        field: String,
        argument: String,
        reason: String,
    },

    #[error("Field \"{field}\" of type \"{type_name}\" must have a selection of subfields")]
    SelectionRequired { field: String, type_name: String },

    #[error("Field \"{field}\" must not have a selection since its type has no subfields")]
    ScalarSelection { field: String },

    #[error("Fields under response key \"{key}\" conflict; use different aliases")]
    ConflictingField { key: String },
}

impl ResolutionError {
    /// Error code reported in the response `extensions`.
    pub fn code(&self) -> &'static str {
        match self {
            ResolutionError::Syntax(_) => "GRAPHQL_PARSE_FAILED",
            _ => "GRAPHQL_VALIDATION_FAILED",
        }
    }
}

/// Resolves query documents into response payloads.
///
/// One engine serves both surfaces; the surface only controls which fields
/// are visible.
#[async_trait]
pub trait ResolutionEngine: Send + Sync {
    /// Query root fields visible on a surface.
    fn root_fields(&self, surface: ApiSurface) -> Vec<String>;

    async fn resolve(
        &self,
        document: &Document,
        surface: ApiSurface,
    ) -> Result<ResponsePayload, ResolutionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    All,
    AdminOnly,
}

impl Visibility {
    fn allows(self, surface: ApiSurface) -> bool {
        match self {
            Visibility::All => true,
            Visibility::AdminOnly => surface.is_privileged(),
        }
    }
}

struct FieldDef {
    name: &'static str,
    visibility: Visibility,
}

const fn field(name: &'static str, visibility: Visibility) -> FieldDef {
    FieldDef { name, visibility }
}

const QUERY_TYPE: &str = "Query";
const QUERY_FIELDS: &[FieldDef] = &[
    field("administrators", Visibility::AdminOnly),
    field("product", Visibility::All),
    field("products", Visibility::All),
];

const PRODUCT_TYPE: &str = "Product";
const PRODUCT_FIELDS: &[FieldDef] = &[
    field("id", Visibility::All),
    field("name", Visibility::All),
    field("slug", Visibility::All),
    field("description", Visibility::All),
    field("price", Visibility::All),
    field("enabled", Visibility::AdminOnly),
];

const ADMINISTRATOR_TYPE: &str = "Administrator";
const ADMINISTRATOR_FIELDS: &[FieldDef] = &[
    field("id", Visibility::All),
    field("identifier", Visibility::All),
    field("firstName", Visibility::All),
    field("lastName", Visibility::All),
];

const TYPENAME: &str = "__typename";

fn ensure_visible(
    type_name: &str,
    fields: &[FieldDef],
    selection: &Selection,
    surface: ApiSurface,
) -> Result<(), ResolutionError> {
    let known = fields
        .iter()
        .any(|f| f.name == selection.name && f.visibility.allows(surface));
    if known {
        Ok(())
    } else {
        Err(ResolutionError::UnknownField {
            type_name: type_name.to_string(),
            field: selection.name.clone(),
        })
    }
}

fn ensure_arguments(selection: &Selection, allowed: &[&str]) -> Result<(), ResolutionError> {
    match selection
        .arguments
        .iter()
        .find(|(name, _)| !allowed.contains(&name.as_str()))
    {
        Some((argument, _)) => Err(ResolutionError::UnknownArgument {
            field: selection.name.clone(),
            argument: argument.clone(),
        }),
        None => Ok(()),
    }
}

fn ensure_leaf(selection: &Selection) -> Result<(), ResolutionError> {
    if !selection.selections.is_empty() {
        return Err(ResolutionError::ScalarSelection {
            field: selection.name.clone(),
        });
    }
    ensure_arguments(selection, &[])
}

/// Read an `ID` argument, accepting strings or integers.
fn id_argument(selection: &Selection, argument: &str) -> Result<Option<String>, ResolutionError> {
    match selection.argument(argument) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) if n.is_i64() => Ok(Some(n.to_string())),
        Some(other) => Err(ResolutionError::InvalidArgument {
            field: selection.name.clone(),
            argument: argument.to_string(),
            reason: format!("expected an ID, found {other}"),
        }),
    }
}

fn count_argument(selection: &Selection, argument: &str) -> Result<Option<usize>, ResolutionError> {
    match selection.argument(argument) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| ResolutionError::InvalidArgument {
                field: selection.name.clone(),
                argument: argument.to_string(),
                reason: format!("expected a non-negative integer, found {n}"),
            }),
        Some(other) => Err(ResolutionError::InvalidArgument {
            field: selection.name.clone(),
            argument: argument.to_string(),
            reason: format!("expected an integer, found {other}"),
        }),
    }
}

/// Write a field into a response object.
///
/// Repeating an identical selection is harmless; two different selections
/// under one response key are rejected.
fn insert_field<'a>(
    object: &mut Map<String, Value>,
    seen: &mut HashMap<&'a str, &'a Selection>,
    selection: &'a Selection,
    value: Value,
) -> Result<(), ResolutionError> {
    let key = selection.response_key();
    match seen.insert(key, selection) {
        Some(previous) if previous != selection => Err(ResolutionError::ConflictingField {
            key: key.to_string(),
        }),
        _ => {
            object.insert(key.to_string(), value);
            Ok(())
        }
    }
}

/// Project an object onto the sub-selection of `selection`.
fn project(
    type_name: &str,
    fields: &[FieldDef],
    selection: &Selection,
    surface: ApiSurface,
    value_of: impl Fn(&str) -> Value,
) -> Result<Value, ResolutionError> {
    if selection.selections.is_empty() {
        return Err(ResolutionError::SelectionRequired {
            field: selection.name.clone(),
            type_name: type_name.to_string(),
        });
    }

    let mut object = Map::new();
    let mut seen = HashMap::new();
    for sub in &selection.selections {
        ensure_leaf(sub)?;
        let value = if sub.name == TYPENAME {
            Value::String(type_name.to_string())
        } else {
            ensure_visible(type_name, fields, sub, surface)?;
            value_of(&sub.name)
        };
        insert_field(&mut object, &mut seen, sub, value)?;
    }
    Ok(Value::Object(object))
}

fn product_field(product: &Product, name: &str) -> Value {
    match name {
        "id" => json!(product.id),
        "name" => json!(product.name),
        "slug" => json!(product.slug),
        "description" => json!(product.description),
        "price" => json!(product.price),
        "enabled" => json!(product.enabled),
        _ => Value::Null,
    }
}

fn administrator_field(admin: &Administrator, name: &str) -> Value {
    match name {
        "id" => json!(admin.id),
        "identifier" => json!(admin.identifier),
        "firstName" => json!(admin.first_name),
        "lastName" => json!(admin.last_name),
        _ => Value::Null,
    }
}

/// Resolution engine serving the in-memory catalog.
///
/// The shop surface never sees disabled products or admin-only fields.
pub struct CatalogEngine {
    store: Arc<CatalogStore>,
}

impl CatalogEngine {
    pub fn new(store: Arc<CatalogStore>) -> Self {
        Self { store }
    }

    fn visible_product(&self, product: Product, surface: ApiSurface) -> Option<Product> {
        (surface.is_privileged() || product.enabled).then_some(product)
    }

    fn resolve_product(
        &self,
        selection: &Selection,
        surface: ApiSurface,
    ) -> Result<Value, ResolutionError> {
        ensure_arguments(selection, &["id", "slug"])?;

        let product = match (id_argument(selection, "id")?, selection.argument("slug")) {
            (Some(id), _) => self.store.product(&id),
            (None, Some(Value::String(slug))) => self.store.product_by_slug(slug),
            (None, _) => {
                return Err(ResolutionError::MissingArgument {
                    field: selection.name.clone(),
                    argument: "id".to_string(),
                })
            }
        };

        match product.and_then(|p| self.visible_product(p, surface)) {
            Some(product) => project(PRODUCT_TYPE, PRODUCT_FIELDS, selection, surface, |name| {
                product_field(&product, name)
            }),
            None => {
                // Still validate the selection so shape errors don't depend on data.
                project(PRODUCT_TYPE, PRODUCT_FIELDS, selection, surface, |_| Value::Null)?;
                Ok(Value::Null)
            }
        }
    }

    fn resolve_products(
        &self,
        selection: &Selection,
        surface: ApiSurface,
    ) -> Result<Value, ResolutionError> {
        ensure_arguments(selection, &["skip", "take"])?;
        let skip = count_argument(selection, "skip")?.unwrap_or(0);
        let take = count_argument(selection, "take")?.unwrap_or(usize::MAX);

        // Validate against an empty object first so an empty catalog still reports errors.
        project(PRODUCT_TYPE, PRODUCT_FIELDS, selection, surface, |_| Value::Null)?;

        let items = self
            .store
            .products()
            .into_iter()
            .filter_map(|p| self.visible_product(p, surface))
            .skip(skip)
            .take(take)
            .map(|product| {
                project(PRODUCT_TYPE, PRODUCT_FIELDS, selection, surface, |name| {
                    product_field(&product, name)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Value::Array(items))
    }

    fn resolve_administrators(
        &self,
        selection: &Selection,
        surface: ApiSurface,
    ) -> Result<Value, ResolutionError> {
        ensure_arguments(selection, &[])?;
        project(ADMINISTRATOR_TYPE, ADMINISTRATOR_FIELDS, selection, surface, |_| Value::Null)?;

        let items = self
            .store
            .administrators()
            .iter()
            .map(|admin| {
                project(
                    ADMINISTRATOR_TYPE,
                    ADMINISTRATOR_FIELDS,
                    selection,
                    surface,
                    |name| administrator_field(admin, name),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Value::Array(items))
    }

    fn resolve_root(
        &self,
        selection: &Selection,
        surface: ApiSurface,
    ) -> Result<Value, ResolutionError> {
        if selection.name == TYPENAME {
            ensure_leaf(selection)?;
            return Ok(Value::String(QUERY_TYPE.to_string()));
        }

        ensure_visible(QUERY_TYPE, QUERY_FIELDS, selection, surface)?;

        match selection.name.as_str() {
            "product" => self.resolve_product(selection, surface),
            "products" => self.resolve_products(selection, surface),
            "administrators" => self.resolve_administrators(selection, surface),
            _ => Err(ResolutionError::UnknownField {
                type_name: QUERY_TYPE.to_string(),
                field: selection.name.clone(),
            }),
        }
    }
}

#[async_trait]
impl ResolutionEngine for CatalogEngine {
    fn root_fields(&self, surface: ApiSurface) -> Vec<String> {
        QUERY_FIELDS
            .iter()
            .filter(|f| f.visibility.allows(surface))
            .map(|f| f.name.to_string())
            .collect()
    }

    async fn resolve(
        &self,
        document: &Document,
        surface: ApiSurface,
    ) -> Result<ResponsePayload, ResolutionError> {
        let mut data = Map::new();
        let mut seen = HashMap::new();
        for selection in &document.selections {
            let value = self.resolve_root(selection, surface)?;
            insert_field(&mut data, &mut seen, selection, value)?;
        }

        Ok(ResponsePayload::new(data))
    }
}
