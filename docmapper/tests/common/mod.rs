#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docmapper::{memory::InMemoryStore, prelude::*};
use serde_json::{Value, json};

pub struct Items;

impl Collection for Items {
    fn collection_name() -> &'static str {
        "items"
    }
}

pub struct Users;

impl Collection for Users {
    fn collection_name() -> &'static str {
        "users"
    }
}

pub struct Owns;

impl Collection for Owns {
    fn collection_name() -> &'static str {
        "owns"
    }

    fn kind() -> CollectionKind {
        CollectionKind::Edge
    }
}

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(fields) => fields,
        other => panic!("expected an object, got {other}"),
    }
}

pub fn names<B: StoreConnector, C: Collection>(records: &[Record<'_, B, C>]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            record
                .get("name")
                .and_then(Value::as_str)
                .expect("name")
                .to_string()
        })
        .collect()
}

/// A store holding the two `items` records every query scenario starts from.
pub async fn store_with_items() -> DocumentStore<InMemoryStore> {
    let store = DocumentStore::new(InMemoryStore::new());
    let items = store.collection::<Items>();

    items
        .create(CollectionOptions::default())
        .await
        .expect("create items");

    let summary = items
        .bulk_import(vec![
            fields(json!({
                "name": "large screen",
                "tags": ["hifi", "display"],
                "price": 229.99,
                "type": "hardware",
            })),
            fields(json!({
                "name": "hard drive",
                "tags": ["storage"],
                "price": 999.99,
                "type": "hardware",
            })),
        ])
        .await
        .expect("import items");
    assert_eq!(summary, ImportSummary { created: 2, errors: 0 });

    store
}

/// Connector counting the writes it forwards to an in-memory store.
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: InMemoryStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for CountingStore {
    async fn query(&self, query: AqlQuery) -> MapperResult<Cursor> {
        if matches!(
            query.statement,
            Statement::Insert { .. } | Statement::Update { .. } | Statement::Remove { .. }
        ) {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }

        self.inner.query(query).await
    }

    async fn collection_exists(&self, name: &str) -> MapperResult<bool> {
        self.inner.collection_exists(name).await
    }

    async fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
        options: CollectionOptions,
    ) -> MapperResult<()> {
        self.inner.create_collection(name, kind, options).await
    }

    async fn drop_collection(&self, name: &str) -> MapperResult<()> {
        self.inner.drop_collection(name).await
    }

    async fn indexes(&self, collection: &str) -> MapperResult<Vec<IndexDescriptor>> {
        self.inner.indexes(collection).await
    }

    async fn create_index(&self, collection: &str, index: IndexDescriptor) -> MapperResult<()> {
        self.inner.create_index(collection, index).await
    }

    async fn import(
        &self,
        collection: &str,
        documents: Vec<Fields>,
    ) -> MapperResult<ImportSummary> {
        self.inner.import(collection, documents).await
    }
}
