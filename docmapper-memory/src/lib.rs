//! In-memory store connector for docmapper.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreConnector` trait. It uses async-aware read-write locks for concurrent
//! access and is meant for development and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Statement execution** - Runs compiled finds, listings and writes without an AQL engine
//! - **AQL value ordering** - Comparisons and sorting follow AQL's type order
//! - **Collection management** - Document and edge collections, indexes, bulk import
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{DocumentStore, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.collection::<Users>();
//!     users.create(Default::default()).await?;
//!
//!     let mut user = users.record_from_json(serde_json::json!({ "name": "Alice" }))?;
//!     user.save().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
