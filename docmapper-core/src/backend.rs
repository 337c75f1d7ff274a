//! Store connector abstraction.
//!
//! The mapper never talks to a database directly. Everything it needs goes
//! through the [`StoreConnector`] trait: running compiled AQL, checking and
//! creating collections, listing and creating indexes, bulk imports.
//!
//! # Overview
//!
//! - [`StoreConnector`]: the async interface every store implements
//! - [`StoreConnectorBuilder`]: factory for connector instances
//! - [`Cursor`]: the stream of raw records produced by a query
//!
//! # Examples
//!
//! ```ignore
//! use docmapper::{aql::AqlQuery, backend::StoreConnector};
//! use futures::TryStreamExt;
//!
//! let query = AqlQuery::all("users", vec![]);
//! let users: Vec<_> = connector.query(query).await?.try_collect().await?;
//! ```

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::fmt::Debug;

use crate::{
    aql::AqlQuery,
    document::{CollectionKind, Fields},
    error::MapperResult,
    index::IndexDescriptor,
};

/// Stream of raw results yielded by [`StoreConnector::query`].
///
/// Records come back as JSON objects carrying their `_id`/`_key` attributes.
/// Statements without a result (update, remove) yield nothing.
pub type Cursor = BoxStream<'static, MapperResult<Value>>;

/// Options passed to [`StoreConnector::create_collection`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionOptions {
    /// Whether writes wait for the data to be synced to disk.
    pub wait_for_sync: Option<bool>,
    /// Driver-specific options forwarded as is.
    pub extra: Fields,
}

impl CollectionOptions {
    pub fn with_wait_for_sync(mut self, wait_for_sync: bool) -> Self {
        self.wait_for_sync = Some(wait_for_sync);
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Number of records stored.
    pub created: usize,
    /// Number of records rejected.
    pub errors: usize,
}

/// Abstract interface to a document store.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and support concurrent access from
/// multiple async tasks. The mapper adds no locking of its own.
///
/// # Error Handling
///
/// Store-side failures are returned as [`MapperError`](crate::error::MapperError)
/// variants and propagated to callers unchanged.
#[async_trait]
pub trait StoreConnector: Send + Sync + Debug {
    /// Runs a compiled query and returns a cursor over its results.
    ///
    /// Connectors speaking AQL send [`AqlQuery::text`] with
    /// [`AqlQuery::bind_vars`]; connectors without a query engine interpret
    /// [`AqlQuery::statement`] instead. Both must yield the same records.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::CollectionNotFound`](crate::error::MapperError::CollectionNotFound)
    /// for an unknown collection, and the document errors for failed writes.
    async fn query(&self, query: AqlQuery) -> MapperResult<Cursor>;

    /// Returns whether the collection exists.
    async fn collection_exists(&self, name: &str) -> MapperResult<bool>;

    /// Creates a collection of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::CollectionAlreadyExists`](crate::error::MapperError::CollectionAlreadyExists)
    /// if the name is taken.
    async fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
        options: CollectionOptions,
    ) -> MapperResult<()>;

    /// Drops a collection and every record in it.
    async fn drop_collection(&self, name: &str) -> MapperResult<()>;

    /// Lists the indexes of a collection, system indexes included.
    async fn indexes(&self, collection: &str) -> MapperResult<Vec<IndexDescriptor>>;

    /// Creates one index on a collection.
    async fn create_index(&self, collection: &str, index: IndexDescriptor) -> MapperResult<()>;

    /// Stores many records at once.
    ///
    /// Rejected records are counted in the summary rather than failing the
    /// whole import.
    async fn import(&self, collection: &str, documents: Vec<Fields>) -> MapperResult<ImportSummary>;

    /// Cleanly shuts down the connector, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> MapperResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreConnector for &B
where
    B: StoreConnector,
{
    async fn query(&self, query: AqlQuery) -> MapperResult<Cursor> {
        (*self).query(query).await
    }

    async fn collection_exists(&self, name: &str) -> MapperResult<bool> {
        (*self).collection_exists(name).await
    }

    async fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
        options: CollectionOptions,
    ) -> MapperResult<()> {
        (*self)
            .create_collection(name, kind, options)
            .await
    }

    async fn drop_collection(&self, name: &str) -> MapperResult<()> {
        (*self).drop_collection(name).await
    }

    async fn indexes(&self, collection: &str) -> MapperResult<Vec<IndexDescriptor>> {
        (*self).indexes(collection).await
    }

    async fn create_index(&self, collection: &str, index: IndexDescriptor) -> MapperResult<()> {
        (*self).create_index(collection, index).await
    }

    async fn import(
        &self,
        collection: &str,
        documents: Vec<Fields>,
    ) -> MapperResult<ImportSummary> {
        (*self).import(collection, documents).await
    }
}

#[async_trait]
pub trait StoreConnectorBuilder {
    type Connector: StoreConnector;

    async fn build(self) -> MapperResult<Self::Connector>;
}
