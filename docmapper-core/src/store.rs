//! Main entry point binding collection types to a store connector.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::store::DocumentStore;
//!
//! let store = DocumentStore::new(connector);
//! let users = store.collection::<Users>();
//! ```

use crate::{
    backend::{StoreConnector, StoreConnectorBuilder},
    collection::TypedCollection,
    document::Collection,
    error::MapperResult,
};

/// A document store owning its connector.
///
/// Collections borrow the connector; the store itself is never mutated by
/// mapper operations.
///
/// # Type Parameters
///
/// * `B` - The connector implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreConnector> {
    connector: B,
}

impl<B: StoreConnector> DocumentStore<B> {
    /// Creates a new document store with the given connector.
    pub fn new(connector: B) -> Self {
        Self { connector }
    }

    /// Builds the connector and wraps it into a store.
    ///
    /// # Errors
    ///
    /// Returns whatever the builder fails with, typically
    /// [`MapperError::Initialization`](crate::error::MapperError::Initialization).
    pub async fn connect<T>(builder: T) -> MapperResult<Self>
    where
        T: StoreConnectorBuilder<Connector = B>,
    {
        Ok(Self::new(builder.build().await?))
    }

    /// Gets the typed collection of `C`.
    ///
    /// The collection name is determined by `C::collection_name()`.
    pub fn collection<C: Collection>(&self) -> TypedCollection<'_, B, C> {
        TypedCollection::new(&self.connector)
    }

    pub fn connector(&self) -> &B {
        &self.connector
    }

    /// Drops a collection and everything in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or deletion fails.
    pub async fn drop_collection(&self, name: &str) -> MapperResult<()> {
        self.connector.drop_collection(name).await
    }

    /// Shuts down the document store and releases the connector.
    pub async fn shutdown(self) -> MapperResult<()> {
        self.connector.shutdown().await
    }
}
