//! Error types and result types for mapping and query operations.
//!
//! Every detected violation is surfaced to the caller through [`MapperError`].
//! Use [`MapperResult<T>`] as the return type for fallible operations.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by the mapper or by a store connector.
///
/// The first group of variants is raised locally and synchronously (grammar,
/// construction and builder invariants). The second group comes from the store
/// and is propagated unchanged.
#[derive(Error, Debug)]
pub enum MapperError {
    /// A method name does not follow the finder/sorter grammar, or a comparator
    /// was given a number of values it cannot compare against.
    #[error("Grammar error: {0}")]
    Grammar(String),
    /// A record reference has the wrong shape or points to another collection.
    #[error("Construction error: {0}")]
    Construction(String),
    /// `and` and `or` were both used on the same query.
    #[error("cannot mix logical operators \"and\" and \"or\"")]
    MixedConnective,
    /// Pagination bounds are out of range.
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    /// An index descriptor declared by a collection is malformed.
    #[error("Invalid index: {0}")]
    InvalidIndex(String),
    /// Serialization/deserialization error when converting records.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// A collection with the given name already exists.
    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),
    /// A document with the given key already exists in the collection.
    /// The first argument is the document key, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document key, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// Any other failure reported by the underlying store.
    #[error("Store error: {0}")]
    Store(String),
}

/// A specialized `Result` type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

impl From<SerdeJsonError> for MapperError {
    fn from(err: SerdeJsonError) -> Self {
        MapperError::Serialization(err.to_string())
    }
}
