//! Typed entry point to one store collection.
//!
//! [`TypedCollection`] binds a [`Collection`] type to a store connector. It
//! opens method-name driven queries, lists and reads records, and manages
//! the collection itself (existence, creation, indexes, bulk import).
//!
//! # Example
//!
//! ```ignore
//! let items = store.collection::<Items>();
//!
//! let cheap = items
//!     .find_by("findByPriceLesserThan", [100])?
//!     .sort_by("sortByPriceAsc")?
//!     .run()
//!     .await?;
//!
//! if let Some(mut item) = items.get("items/123").await? {
//!     item.set("price", 89)?;
//!     item.save().await?;
//! }
//! ```

use futures::{TryStreamExt, future};
use serde_json::Value;
use std::{fmt, marker::PhantomData};
use tracing::info;

use crate::{
    aql::AqlQuery,
    backend::{CollectionOptions, ImportSummary, StoreConnector},
    document::{Collection, CollectionKind, Fields, RecordRef, json_type},
    error::{MapperError, MapperResult},
    executor::Query,
    index::{IndexDescriptor, missing_indexes},
    query::{BindValue, QueryPlan, Sort, SortDirection},
    record::Record,
};

/// A collection of `C` records reached through connector `B`.
///
/// Cheap to copy: it only holds the connector reference.
pub struct TypedCollection<'a, B, C> {
    connector: &'a B,
    _collection: PhantomData<fn() -> C>,
}

impl<B, C> Clone for TypedCollection<'_, B, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B, C> Copy for TypedCollection<'_, B, C> {}

impl<B, C: Collection> fmt::Debug for TypedCollection<'_, B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCollection")
            .field("name", &C::collection_name())
            .finish()
    }
}

impl<'a, B, C> TypedCollection<'a, B, C>
where
    B: StoreConnector,
    C: Collection,
{
    pub(crate) fn new(connector: &'a B) -> Self {
        Self {
            connector,
            _collection: PhantomData,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &'static str {
        C::collection_name()
    }

    pub fn kind(&self) -> CollectionKind {
        C::kind()
    }

    pub fn connector(&self) -> &'a B {
        self.connector
    }

    /// Builds a record from a global id or a field bag.
    ///
    /// Nothing is read from the store: a record built from an id only carries
    /// its identity until [`Record::refresh`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] for a malformed or foreign id.
    pub fn record(&self, reference: impl Into<RecordRef>) -> MapperResult<Record<'a, B, C>> {
        Record::new(self.connector, reference.into())
    }

    /// Builds a record from a JSON string (an id) or object (a field bag).
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] for any other JSON type.
    pub fn record_from_json(&self, value: Value) -> MapperResult<Record<'a, B, C>> {
        self.record(RecordRef::try_from(value)?)
    }

    /// Opens a query from a `findBy<Field><Comparator?>` name.
    ///
    /// # Arguments
    ///
    /// * `name` - The finder name, e.g. `findByPriceGreaterThan`
    /// * `values` - The values bound to the filter
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Grammar`] if the name does not parse or the
    /// comparator cannot take that many values.
    pub fn find_by<V: Into<BindValue>>(
        &self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> MapperResult<Query<'a, B, C>> {
        Ok(Query::new(*self, QueryPlan::find_by(name, values)?))
    }

    /// Lists every record, ordered by the given `(field, direction)` pairs.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn all(
        &self,
        sort_by: &[(&str, SortDirection)],
    ) -> MapperResult<Vec<Record<'a, B, C>>> {
        let sorts = sort_by
            .iter()
            .map(|(field, direction)| Sort {
                field: field.to_string(),
                direction: *direction,
            })
            .collect();

        self.fetch(AqlQuery::all(C::collection_name(), sorts)).await
    }

    /// Reads one record by global id.
    ///
    /// Returns `None` when the store has no such record.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] for an empty id or an id of
    /// another collection, and propagates store errors.
    pub async fn get(&self, id: &str) -> MapperResult<Option<Record<'a, B, C>>> {
        match read_document::<B, C>(self.connector, id).await? {
            Some(document) => Ok(Some(self.record(document)?)),
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get), returning the stored field bag as is.
    pub async fn get_raw(&self, id: &str) -> MapperResult<Option<Fields>> {
        read_document::<B, C>(self.connector, id).await
    }

    /// Removes a record given its key or global id.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] for an empty reference or an id
    /// of another collection, and propagates store errors such as
    /// [`MapperError::DocumentNotFound`].
    pub async fn delete(&self, reference: &str) -> MapperResult<()> {
        let key = C::key_from_id(reference)?;

        self.connector
            .query(AqlQuery::remove(C::collection_name(), key))
            .await?
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    /// Returns whether the collection exists in the store.
    pub async fn exists(&self) -> MapperResult<bool> {
        self.connector
            .collection_exists(C::collection_name())
            .await
    }

    /// Creates the collection, then applies its declared indexes.
    ///
    /// Returns the indexes that were created.
    pub async fn create(&self, options: CollectionOptions) -> MapperResult<Vec<IndexDescriptor>> {
        self.connector
            .create_collection(C::collection_name(), C::kind(), options)
            .await?;

        self.apply_indexes().await
    }

    /// Creates the declared indexes the collection does not have yet.
    ///
    /// Existing indexes are matched by type and field set. Indexes are created
    /// one after the other; the created ones are returned.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::InvalidIndex`] before touching the store if a
    /// declared index is malformed.
    pub async fn apply_indexes(&self) -> MapperResult<Vec<IndexDescriptor>> {
        let declared = C::indexes();
        if declared.is_empty() {
            return Ok(Vec::new());
        }

        for index in &declared {
            index.validate()?;
        }

        let existing = self
            .connector
            .indexes(C::collection_name())
            .await?;

        let mut created = Vec::new();
        for index in missing_indexes(&declared, &existing) {
            self.connector
                .create_index(C::collection_name(), index.clone())
                .await?;

            info!(
                collection = C::collection_name(),
                kind = %index.kind,
                fields = ?index.fields,
                "created index"
            );
            created.push(index.clone());
        }

        Ok(created)
    }

    /// Stores many raw records at once.
    pub async fn bulk_import(&self, documents: Vec<Fields>) -> MapperResult<ImportSummary> {
        self.connector
            .import(C::collection_name(), documents)
            .await
    }

    /// Runs a query and wraps every result into a record.
    pub(crate) async fn fetch(&self, query: AqlQuery) -> MapperResult<Vec<Record<'a, B, C>>> {
        let collection = *self;

        self.connector
            .query(query)
            .await?
            .and_then(move |value| future::ready(collection.record_from_json(value)))
            .try_collect()
            .await
    }
}

/// Reads one stored record by global id.
///
/// `None` means the record does not exist.
pub(crate) async fn read_document<B, C>(connector: &B, id: &str) -> MapperResult<Option<Fields>>
where
    B: StoreConnector,
    C: Collection,
{
    if id.is_empty() {
        return Err(MapperError::Construction("id must be provided".into()));
    }

    let wrong_collection = || {
        MapperError::Construction(format!(
            "id must be from \"{}\" collection. Actual: \"{id}\"",
            C::collection_name()
        ))
    };

    C::key_of(id).map_err(|_| wrong_collection())?;

    let result = connector
        .query(AqlQuery::document(C::collection_name(), id))
        .await?
        .try_next()
        .await?;

    match result {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(false)) => Err(wrong_collection()),
        Some(Value::Object(document)) => Ok(Some(document)),
        Some(other) => Err(MapperError::Store(format!(
            "expected a document for {id}, got {}",
            json_type(&other)
        ))),
    }
}
