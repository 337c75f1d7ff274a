//! Convenient re-exports of commonly used types from docmapper.
//!
//! ```ignore
//! use docmapper::prelude::*;
//! ```
//!
//! This provides access to:
//! - Collection traits and the derive macro
//! - Store connectors and builders
//! - Queries, records and their options
//! - Error types

pub use docmapper_core::{
    aql::{AqlQuery, Statement},
    backend::{CollectionOptions, Cursor, ImportSummary, StoreConnector, StoreConnectorBuilder},
    collection::TypedCollection,
    document::{Collection, CollectionKind, Fields, RecordRef},
    error::{MapperError, MapperResult},
    executor::{BooleanExpression, Query},
    index::IndexDescriptor,
    query::{BindValue, Pattern, SortDirection},
    record::{Record, RecordState, SerializeOptions},
    store::DocumentStore,
};
pub use docmapper_macros::Collection;
