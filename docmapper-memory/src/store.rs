//! In-memory store connector.
//!
//! Stores documents as JSON objects in insertion order behind an async-safe
//! read-write lock. Compiled queries are executed by interpreting their
//! [`Statement`] rather than parsing the AQL text.

use async_trait::async_trait;
use futures::{StreamExt, stream};
use mea::rwlock::RwLock;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;
use uuid::Uuid;

use docmapper_core::{
    aql::{AqlQuery, Statement},
    backend::{CollectionOptions, Cursor, ImportSummary, StoreConnector, StoreConnectorBuilder},
    document::{CollectionKind, FROM, Fields, ID, KEY, TO, split_id},
    error::{MapperError, MapperResult},
    index::IndexDescriptor,
    query::{QueryPlan, Sort},
};

use crate::evaluator::{Comparable, compile_patterns, filter_documents, sort_documents};

#[derive(Debug)]
struct MemoryCollection {
    kind: CollectionKind,
    /// Documents in insertion order.
    documents: Vec<Fields>,
    indexes: Vec<IndexDescriptor>,
}

impl MemoryCollection {
    fn new(kind: CollectionKind) -> Self {
        let mut indexes = vec![IndexDescriptor::new("primary", [KEY]).with_option("unique", true)];
        if kind == CollectionKind::Edge {
            indexes.push(IndexDescriptor::new("edge", [FROM, TO]));
        }

        Self {
            kind,
            documents: Vec::new(),
            indexes,
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.documents
            .iter()
            .position(|document| document.get(KEY).and_then(Value::as_str) == Some(key))
    }

    fn insert(&mut self, name: &str, mut document: Fields) -> MapperResult<Fields> {
        if self.kind == CollectionKind::Edge {
            for attribute in [FROM, TO] {
                let valid = document
                    .get(attribute)
                    .and_then(Value::as_str)
                    .is_some_and(|id| split_id(id).is_some());

                if !valid {
                    return Err(MapperError::Store(format!(
                        "edge attribute {attribute} is missing or invalid in collection {name}"
                    )));
                }
            }
        }

        let key = match document.get(KEY) {
            Some(Value::String(key)) if !key.is_empty() && !key.contains('/') => key.clone(),
            Some(other) => {
                return Err(MapperError::Store(format!("illegal document key {other}")));
            }
            None => Uuid::new_v4().simple().to_string(),
        };

        if self.position(&key).is_some() {
            return Err(MapperError::DocumentAlreadyExists(key, name.to_string()));
        }

        document.insert(KEY.to_string(), Value::from(key.as_str()));
        document.insert(ID.to_string(), Value::from(format!("{name}/{key}")));

        self.check_unique(name, &document, None)?;
        self.documents.push(document.clone());

        Ok(document)
    }

    fn update(&mut self, name: &str, key: &str, patch: Fields) -> MapperResult<()> {
        let position = self
            .position(key)
            .ok_or_else(|| MapperError::DocumentNotFound(key.to_string(), name.to_string()))?;

        let mut document = self.documents[position].clone();
        document.extend(
            patch
                .into_iter()
                .filter(|(attribute, _)| attribute != ID && attribute != KEY),
        );

        self.check_unique(name, &document, Some(position))?;
        self.documents[position] = document;

        Ok(())
    }

    fn remove(&mut self, name: &str, key: &str) -> MapperResult<()> {
        let position = self
            .position(key)
            .ok_or_else(|| MapperError::DocumentNotFound(key.to_string(), name.to_string()))?;

        self.documents.remove(position);
        Ok(())
    }

    /// Rejects `document` if it collides with another one on a unique index.
    fn check_unique(&self, name: &str, document: &Fields, skip: Option<usize>) -> MapperResult<()> {
        let unique = self
            .indexes
            .iter()
            .filter(|index| index.kind != "primary")
            .filter(|index| index.options.get("unique") == Some(&Value::Bool(true)));

        for index in unique {
            let sparse = index.options.get("sparse") == Some(&Value::Bool(true));
            let values = index
                .fields
                .iter()
                .map(|field| Comparable::from(document.get(field)))
                .collect::<Vec<_>>();

            if sparse && values.iter().any(|value| *value == Comparable::Null) {
                continue;
            }

            let collides = self
                .documents
                .iter()
                .enumerate()
                .filter(|(position, _)| Some(*position) != skip)
                .any(|(_, other)| {
                    index
                        .fields
                        .iter()
                        .zip(&values)
                        .all(|(field, value)| Comparable::from(other.get(field)) == *value)
                });

            if collides {
                return Err(MapperError::Store(format!(
                    "unique constraint violated on {name} index {:?}",
                    index.fields
                )));
            }
        }

        Ok(())
    }

    fn select(&self, plan: Option<&QueryPlan>, sorts: &[Sort]) -> MapperResult<Vec<Value>> {
        let mut selected = match plan {
            Some(plan) => {
                let patterns = compile_patterns(plan)?;
                filter_documents(&self.documents, plan, &patterns)?
            }
            None => self.documents.iter().collect(),
        };

        sort_documents(&mut selected, sorts);

        let (offset, count) = match plan.and_then(QueryPlan::window) {
            Some(window) => (window.offset as usize, window.count as usize),
            None => (0, usize::MAX),
        };

        Ok(selected
            .into_iter()
            .skip(offset)
            .take(count)
            .map(|document| Value::Object(document.clone()))
            .collect())
    }
}

type StoreMap = HashMap<String, MemoryCollection>;

/// Thread-safe in-memory store connector.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state;
/// clones share the same data.
///
/// Keys are generated as 32 hexadecimal characters. Queries scan every
/// document of a collection; declared indexes are recorded and unique ones
/// are enforced, but none speeds anything up.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::InMemoryStore;
/// use docmapper::{backend::StoreConnector, document::CollectionKind};
///
/// let store = InMemoryStore::new();
/// store
///     .create_collection("users", CollectionKind::Document, Default::default())
///     .await?;
/// assert!(store.collection_exists("users").await?);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> collection
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    async fn execute(&self, query: AqlQuery) -> MapperResult<Vec<Value>> {
        let name = query.collection.as_str();

        match query.statement {
            Statement::Find(plan) => {
                let store = self.store.read().await;
                collection(&store, name)?.select(Some(&plan), plan.sorts())
            }
            Statement::All { sorts } => {
                let store = self.store.read().await;
                collection(&store, name)?.select(None, &sorts)
            }
            Statement::Document { id } => {
                let store = self.store.read().await;

                let document = match split_id(&id) {
                    Some((owner, _)) if owner != name => Value::Bool(false),
                    Some((owner, key)) => store
                        .get(owner)
                        .and_then(|collection| {
                            collection.position(key).map(|position| {
                                Value::Object(collection.documents[position].clone())
                            })
                        })
                        .unwrap_or(Value::Null),
                    None => Value::Bool(false),
                };

                Ok(vec![document])
            }
            Statement::Insert { document } => {
                let mut store = self.store.write().await;
                let stored = collection_mut(&mut store, name)?.insert(name, document)?;
                Ok(vec![Value::Object(stored)])
            }
            Statement::Update { key, patch } => {
                let mut store = self.store.write().await;
                collection_mut(&mut store, name)?.update(name, &key, patch)?;
                Ok(Vec::new())
            }
            Statement::Remove { key } => {
                let mut store = self.store.write().await;
                collection_mut(&mut store, name)?.remove(name, &key)?;
                Ok(Vec::new())
            }
        }
    }
}

fn collection<'a>(store: &'a StoreMap, name: &str) -> MapperResult<&'a MemoryCollection> {
    store
        .get(name)
        .ok_or_else(|| MapperError::CollectionNotFound(name.to_string()))
}

fn collection_mut<'a>(
    store: &'a mut StoreMap,
    name: &str,
) -> MapperResult<&'a mut MemoryCollection> {
    store
        .get_mut(name)
        .ok_or_else(|| MapperError::CollectionNotFound(name.to_string()))
}

#[async_trait]
impl StoreConnector for InMemoryStore {
    async fn query(&self, query: AqlQuery) -> MapperResult<Cursor> {
        let results = self.execute(query).await?;
        Ok(stream::iter(results.into_iter().map(Ok)).boxed())
    }

    async fn collection_exists(&self, name: &str) -> MapperResult<bool> {
        Ok(self.store.read().await.contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
        options: CollectionOptions,
    ) -> MapperResult<()> {
        let mut store = self.store.write().await;

        if store.contains_key(name) {
            return Err(MapperError::CollectionAlreadyExists(name.to_string()));
        }

        store.insert(name.to_string(), MemoryCollection::new(kind));
        debug!(collection = name, ?kind, ?options, "created collection");

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> MapperResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(MapperError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn indexes(&self, collection_name: &str) -> MapperResult<Vec<IndexDescriptor>> {
        let store = self.store.read().await;
        Ok(collection(&store, collection_name)?.indexes.clone())
    }

    async fn create_index(
        &self,
        collection_name: &str,
        index: IndexDescriptor,
    ) -> MapperResult<()> {
        index.validate()?;

        let mut store = self.store.write().await;
        let target = collection_mut(&mut store, collection_name)?;

        if target.indexes.iter().any(|existing| existing.matches(&index)) {
            return Ok(());
        }

        target.indexes.push(index);
        Ok(())
    }

    async fn import(
        &self,
        collection_name: &str,
        documents: Vec<Fields>,
    ) -> MapperResult<ImportSummary> {
        let mut store = self.store.write().await;
        let target = collection_mut(&mut store, collection_name)?;

        let mut summary = ImportSummary::default();
        for document in documents {
            match target.insert(collection_name, document) {
                Ok(_) => summary.created += 1,
                Err(err) => {
                    debug!(
                        collection = collection_name,
                        error = %err,
                        "rejected imported document"
                    );
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::InMemoryStore;
/// use docmapper::backend::StoreConnectorBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreConnectorBuilder for InMemoryStoreBuilder {
    type Connector = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> MapperResult<Self::Connector> {
        Ok(InMemoryStore::new())
    }
}
