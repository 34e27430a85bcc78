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

//! Schema resolution shared by both API surfaces.

pub mod catalog;
pub mod document;
pub mod engine;

pub use catalog::{Administrator, CatalogStore, NewAdministrator, NewProduct, Product};
pub use document::{Document, DocumentError, Selection};
pub use engine::{CatalogEngine, ResolutionEngine, ResolutionError};
