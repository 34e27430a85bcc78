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

//! In-memory catalog backing the reference resolution engine.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Format of every entity id handed out by the catalog.
pub fn entity_id(index: usize) -> String {
    format!("T_{index}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Price in minor currency units.
    pub price: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Administrator {
    pub id: String,
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
}

/// Product fields before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct NewAdministrator {
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default)]
struct CatalogState {
    products: Vec<Product>,
    administrators: Vec<Administrator>,
    customers: usize,
}

/// Catalog owned by one server instance.
///
/// Written during provisioning, read concurrently by request handlers.
#[derive(Debug, Default)]
pub struct CatalogStore {
    state: RwLock<CatalogState>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product, assigning the next `T_n` id.
    pub fn insert_product(&self, product: NewProduct) -> Product {
        let mut state = self.state.write();
        let product = Product {
            id: entity_id(state.products.len() + 1),
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            enabled: product.enabled,
        };
        state.products.push(product.clone());
        product
    }

    pub fn insert_administrator(&self, admin: NewAdministrator) -> Administrator {
        let mut state = self.state.write();
        let admin = Administrator {
            id: entity_id(state.administrators.len() + 1),
            identifier: admin.identifier,
            first_name: admin.first_name,
            last_name: admin.last_name,
        };
        state.administrators.push(admin.clone());
        admin
    }

    pub fn add_customers(&self, count: usize) {
        self.state.write().customers += count;
    }

    pub fn product(&self, id: &str) -> Option<Product> {
        self.state.read().products.iter().find(|p| p.id == id).cloned()
    }

    pub fn product_by_slug(&self, slug: &str) -> Option<Product> {
        self.state
            .read()
            .products
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
    }

    /// All products in insertion order.
    pub fn products(&self) -> Vec<Product> {
        self.state.read().products.clone()
    }

    pub fn administrators(&self) -> Vec<Administrator> {
        self.state.read().administrators.clone()
    }

    pub fn administrator_by_identifier(&self, identifier: &str) -> Option<Administrator> {
        self.state
            .read()
            .administrators
            .iter()
            .find(|a| a.identifier == identifier)
            .cloned()
    }

    pub fn product_count(&self) -> usize {
        self.state.read().products.len()
    }

    pub fn customer_count(&self) -> usize {
        self.state.read().customers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(name: &str, enabled: bool) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: String::new(),
            price: 100,
            enabled,
        }
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let store = CatalogStore::new();
        let laptop = store.insert_product(new_product("Laptop", true));
        let monitor = store.insert_product(new_product("Monitor", false));

        assert_eq!(laptop.id, "T_1");
        assert_eq!(monitor.id, "T_2");
        assert_eq!(store.product("T_2").map(|p| p.name), Some("Monitor".to_string()));
        assert_eq!(store.product_by_slug("laptop").map(|p| p.id), Some("T_1".to_string()));
        assert!(store.product("T_3").is_none());
        assert_eq!(store.product_count(), 2);
    }

    #[test]
    fn test_administrators_and_customers() {
        let store = CatalogStore::new();
        let admin = store.insert_administrator(NewAdministrator {
            identifier: "superadmin".to_string(),
            first_name: "Super".to_string(),
            last_name: "Admin".to_string(),
        });
        store.add_customers(3);

        assert_eq!(admin.id, "T_1");
        assert!(store.administrator_by_identifier("superadmin").is_some());
        assert_eq!(store.customer_count(), 3);
    }
}
