//! Convention-driven document mapping and method-name queries for document stores.
//!
//! This crate is the primary entry point of the docmapper project. It
//! re-exports the core types from the sub-crates and gives access to the
//! bundled store connectors.
//!
//! # Features
//!
//! - **Method-name queries** - `findByPriceGreaterThan`, `sortByNameAsc` and friends,
//!   compiled to parameterized AQL
//! - **Change-tracked records** - Saves write only the fields that changed
//! - **Collection management** - Existence checks, creation, index application, bulk import
//! - **Pluggable stores** - Anything implementing [`backend::StoreConnector`]
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[derive(Collection)]
//! #[collection(name = "items", index(fields = "name", unique))]
//! pub struct Items;
//!
//! #[tokio::main]
//! async fn main() -> MapperResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let items = store.collection::<Items>();
//!     items.create(CollectionOptions::default()).await?;
//!
//!     let mut screen =
//!         items.record_from_json(json!({ "name": "large screen", "price": 229.99 }))?;
//!     screen.save().await?;
//!
//!     let cheap = items
//!         .find_by("findByPriceLesserThan", [500])?
//!         .sort_by("sortByNameAsc")?
//!         .run()
//!         .await?;
//!
//!     for item in &cheap {
//!         println!("{item}");
//!     }
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Stores
//!
//! - [`memory`] - In-memory connector for development and testing

#[allow(unused_extern_crates)]
extern crate self as docmapper;

pub mod prelude;

pub use docmapper_core::{
    aql, backend, collection, document, error, executor, grammar, index, query, record, store,
};
pub use docmapper_macros::Collection;

// Re-export JSON types for convenience
pub use serde_json;

/// In-memory store connector.
pub mod memory {
    pub use docmapper_memory::{InMemoryStore, InMemoryStoreBuilder};
}
