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

//! Seed data provisioning.

use crate::schema::{CatalogStore, NewAdministrator, NewProduct};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid product {name:?}: {reason}")]
    InvalidProduct { name: String, reason: String },

    #[error("Duplicate product slug: {0}")]
    DuplicateSlug(String),

    #[error("Duplicate administrator identifier: {0}")]
    DuplicateAdministrator(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub administrators: Vec<SeedAdministrator>,
    #[serde(default)]
    pub customer_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    /// Derived from the name when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAdministrator {
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
}

impl SeedProduct {
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self {
            name: name.into(),
            slug: None,
            description: String::new(),
            price,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn resolved_slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| slugify(&self.name))
    }
}

/// Lowercase, ASCII alphanumerics separated by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn with_product(mut self, product: SeedProduct) -> Self {
        self.products.push(product);
        self
    }

    pub fn with_customers(mut self, count: usize) -> Self {
        self.customer_count = count;
        self
    }

    /// Check the whole data set before anything is written.
    pub fn validate(&self, existing_admins: &[String]) -> Result<(), SeedError> {
        let mut slugs = HashSet::new();
        for product in &self.products {
            if product.name.trim().is_empty() {
                return Err(SeedError::InvalidProduct {
                    name: product.name.clone(),
                    reason: "name must not be empty".to_string(),
                });
            }
            if product.price < 0 {
                return Err(SeedError::InvalidProduct {
                    name: product.name.clone(),
                    reason: format!("negative price {}", product.price),
                });
            }
            let slug = product.resolved_slug();
            if slug.is_empty() {
                return Err(SeedError::InvalidProduct {
                    name: product.name.clone(),
                    reason: "slug must not be empty".to_string(),
                });
            }
            if !slugs.insert(slug.clone()) {
                return Err(SeedError::DuplicateSlug(slug));
            }
        }

        let mut identifiers: HashSet<&str> = existing_admins.iter().map(String::as_str).collect();
        for admin in &self.administrators {
            if !identifiers.insert(admin.identifier.as_str()) {
                return Err(SeedError::DuplicateAdministrator(admin.identifier.clone()));
            }
        }

        Ok(())
    }
}

/// Counts of provisioned entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub products: usize,
    pub administrators: usize,
    pub customers: usize,
}

/// Writes seed data into a catalog.
pub struct DataProvisioner {
    store: Arc<CatalogStore>,
}

impl DataProvisioner {
    pub fn new(store: Arc<CatalogStore>) -> Self {
        Self { store }
    }

    /// Provision a data set. Nothing is written if validation fails.
    pub async fn provision(&self, seed: &SeedData) -> Result<ProvisionReport, SeedError> {
        let existing: Vec<String> = self
            .store
            .administrators()
            .into_iter()
            .map(|a| a.identifier)
            .collect();
        seed.validate(&existing)?;

        for product in &seed.products {
            let created = self.store.insert_product(NewProduct {
                name: product.name.clone(),
                slug: product.resolved_slug(),
                description: product.description.clone(),
                price: product.price,
                enabled: product.enabled,
            });
            tracing::debug!(id = %created.id, name = %created.name, "Seeded product");
        }

        for admin in &seed.administrators {
            self.store.insert_administrator(NewAdministrator {
                identifier: admin.identifier.clone(),
                first_name: admin.first_name.clone(),
                last_name: admin.last_name.clone(),
            });
        }

        self.store.add_customers(seed.customer_count);

        let report = ProvisionReport {
            products: seed.products.len(),
            administrators: seed.administrators.len(),
            customers: seed.customer_count,
        };
        tracing::info!(
            products = report.products,
            administrators = report.administrators,
            customers = report.customers,
            "Seed data provisioned"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "products": [
            {
                "name": "Laptop",
                "price": 129900,
                "description": "Now equipped with seventh-generation Intel Core processors"
            },
            { "name": "Curvy Monitor", "slug": "curvy", "price": 14374 },
            { "name": "Old Stock", "price": 100, "enabled": false }
        ],
        "administrators": [
            { "identifier": "editor@test.com", "firstName": "Ed", "lastName": "Itor" }
        ],
        "customerCount": 2
    }"#;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Curvy Monitor"), "curvy-monitor");
        assert_eq!(slugify("  Hard--Drive 2TB! "), "hard-drive-2tb");
        assert_eq!(slugify("!!"), "");
    }

    #[tokio::test]
    async fn test_provision_assigns_sequential_ids() {
        let store = Arc::new(CatalogStore::new());
        let seed = SeedData::from_json(FIXTURE).unwrap();

        let report = DataProvisioner::new(store.clone())
            .provision(&seed)
            .await
            .unwrap();

        assert_eq!(
            report,
            ProvisionReport {
                products: 3,
                administrators: 1,
                customers: 2
            }
        );
        let laptop = store.product("T_1").unwrap();
        assert_eq!(laptop.name, "Laptop");
        assert_eq!(laptop.slug, "laptop");
        assert_eq!(store.product("T_2").unwrap().slug, "curvy");
        assert!(!store.product("T_3").unwrap().enabled);
        assert_eq!(store.customer_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_seed_writes_nothing() {
        let store = Arc::new(CatalogStore::new());
        let seed = SeedData::default()
            .with_product(SeedProduct::new("Laptop", 100))
            .with_product(SeedProduct::new("laptop", 200));

        let err = DataProvisioner::new(store.clone())
            .provision(&seed)
            .await
            .unwrap_err();

        assert!(matches!(err, SeedError::DuplicateSlug(slug) if slug == "laptop"));
        assert_eq!(store.product_count(), 0);
    }

    #[test]
    fn test_validation_rules() {
        let negative = SeedData::default().with_product(SeedProduct::new("Laptop", -1));
        assert!(matches!(
            negative.validate(&[]),
            Err(SeedError::InvalidProduct { .. })
        ));

        let seed = SeedData::from_json(FIXTURE).unwrap();
        assert!(matches!(
            seed.validate(&["editor@test.com".to_string()]),
            Err(SeedError::DuplicateAdministrator(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let seed = SeedData::from_file(file.path()).unwrap();
        assert_eq!(seed.products.len(), 3);
        assert_eq!(seed.customer_count, 2);

        let err = SeedData::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
        assert!(matches!(
            SeedData::from_json("{ not json"),
            Err(SeedError::Parse(_))
        ));
    }
}
