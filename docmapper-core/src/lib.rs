//! A convention-driven document mapper and query builder for document databases.
//!
//! This crate is the core of the docmapper project and provides:
//!
//! - **Method-name grammar** ([`grammar`]) - Parsing of `findBy…` and `sortBy…` names
//! - **Query plans** ([`query`]) - Filters, connective, sort keys and result window
//! - **AQL compilation** ([`aql`]) - Parameterized query text and bind variables
//! - **Store connector abstraction** ([`backend`]) - The interface stores implement
//! - **Collections** ([`document`], [`collection`]) - Binding types to store collections
//! - **Records** ([`record`]) - Change-tracked documents with minimal write-back
//! - **Query execution** ([`executor`]) - The call-chain builder and its `run`
//! - **Indexes** ([`index`]) - Declared index descriptors and their diffing
//! - **Document store** ([`store`]) - Main entry point owning a connector
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmapper_core::{document::Collection, store::DocumentStore};
//!
//! pub struct Items;
//!
//! impl Collection for Items {
//!     fn collection_name() -> &'static str {
//!         "items"
//!     }
//! }
//!
//! let store = DocumentStore::new(connector);
//! let hardware = store
//!     .collection::<Items>()
//!     .find_by("findByType", ["hardware"])?
//!     .run()
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_core;

pub mod aql;
pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod executor;
pub mod grammar;
pub mod index;
pub mod query;
pub mod record;
pub mod store;
