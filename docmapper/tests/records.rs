mod common;

use common::{CountingStore, Items, Owns, Users, fields, store_with_items};
use docmapper::{memory::InMemoryStore, prelude::*};
use regex::Regex;
use serde_json::{Value, json};

async fn users_store() -> DocumentStore<InMemoryStore> {
    let store = DocumentStore::new(InMemoryStore::new());
    store
        .collection::<Users>()
        .create(CollectionOptions::default())
        .await
        .expect("create users");
    store
}

#[tokio::test]
async fn fresh_record_is_inserted() {
    let store = users_store().await;
    let users = store.collection::<Users>();

    let mut user = users
        .record_from_json(json!({"firstname": "Ada", "lastname": "Lovelace"}))
        .expect("record");
    assert_eq!(user.state(), RecordState::Unidentified);
    assert_eq!(user.dirty_fields().collect::<Vec<_>>(), ["firstname", "lastname"]);

    user.save().await.expect("save");

    assert_eq!(user.state(), RecordState::Identified);
    assert!(!user.is_dirty());

    let key = user.key().expect("key").to_string();
    assert!(Regex::new(r"^\w+$").expect("regex").is_match(&key));
    assert_eq!(user.id(), Some(format!("users/{key}").as_str()));

    let stored = users
        .get_raw(&format!("users/{key}"))
        .await
        .expect("get")
        .expect("stored document");
    assert_eq!(stored.get("firstname"), Some(&json!("Ada")));
    assert_eq!(stored.get("_key"), Some(&json!(key)));
}

#[tokio::test]
async fn requested_key_is_kept() {
    let store = users_store().await;

    let mut user = store
        .collection::<Users>()
        .record_from_json(json!({"_key": "ada", "firstname": "Ada"}))
        .expect("record");
    assert!(user.diff().contains_key("_key"));

    user.save().await.expect("save");

    assert_eq!(user.key(), Some("ada"));
    assert_eq!(user.id(), Some("users/ada"));
}

#[tokio::test]
async fn saving_twice_writes_once() {
    let store = DocumentStore::new(CountingStore::default());
    let users = store.collection::<Users>();
    users
        .create(CollectionOptions::default())
        .await
        .expect("create");

    let mut user = users
        .record_from_json(json!({"firstname": "Ada"}))
        .expect("record");

    user.save().await.expect("first save");
    user.save().await.expect("second save");
    assert_eq!(store.connector().writes(), 1);

    assert!(user.set("lastname", "Lovelace").expect("set"));
    user.save().await.expect("update");
    user.save().await.expect("repeated update");
    assert_eq!(store.connector().writes(), 2);

    assert!(!user.set("lastname", "Lovelace").expect("set"));
    user.save().await.expect("unchanged");
    assert_eq!(store.connector().writes(), 2);
}

#[tokio::test]
async fn equal_values_are_not_dirty() {
    let store = store_with_items().await;
    let items = store.collection::<Items>();

    let mut item = items
        .find_by("findByName", ["large screen"])
        .expect("finder")
        .run()
        .await
        .expect("run")
        .pop()
        .expect("one item");
    assert!(!item.is_dirty());

    assert!(!item.set("price", 229.99).expect("set"));
    assert!(!item.set("tags", json!(["hifi", "display"])).expect("set"));
    assert!(!item.is_dirty());

    assert!(item.set("price", 199).expect("set"));
    assert!(item.set("stock", 3).expect("set"));
    assert_eq!(item.dirty_fields().collect::<Vec<_>>(), ["price", "stock"]);
    assert_eq!(item.diff(), fields(json!({"price": 199, "stock": 3})));
}

#[tokio::test]
async fn numbers_compare_by_value() {
    let store = users_store().await;

    let mut user = store
        .collection::<Users>()
        .record_from_json(json!({"age": 36}))
        .expect("record");
    user.save().await.expect("save");

    assert!(!user.set("age", 36.0).expect("set"));
}

#[tokio::test]
async fn reserved_names_cannot_be_set() {
    let store = users_store().await;
    let mut user = store
        .collection::<Users>()
        .record_from_json(json!({}))
        .expect("record");

    for name in ["_key", "_id", "$id", "to_json", "to_string"] {
        let err = user.set(name, 1).unwrap_err();
        assert!(matches!(err, MapperError::Construction(_)), "{name}");
    }
    assert!(!user.is_dirty());
}

#[tokio::test]
async fn updates_write_only_the_diff() {
    let store = store_with_items().await;
    let items = store.collection::<Items>();

    let id = items
        .find_by("findByName", ["hard drive"])
        .expect("finder")
        .run()
        .await
        .expect("run")[0]
        .id()
        .expect("id")
        .to_string();

    let mut first = items.get(&id).await.expect("get").expect("item");
    let mut second = items.get(&id).await.expect("get").expect("item");

    first.set("name", "ssd").expect("set");
    first.save().await.expect("save");

    second.set("price", 499.99).expect("set");
    second.save().await.expect("save");

    let stored = items.get_raw(&id).await.expect("get").expect("item");
    assert_eq!(stored.get("name"), Some(&json!("ssd")));
    assert_eq!(stored.get("price"), Some(&json!(499.99)));
}

#[tokio::test]
async fn refresh_reloads_stored_state() {
    let store = store_with_items().await;
    let items = store.collection::<Items>();

    let id = items
        .find_by("findByName", ["large screen"])
        .expect("finder")
        .run()
        .await
        .expect("run")[0]
        .id()
        .expect("id")
        .to_string();

    let mut stale = items.record(id.as_str()).expect("record");
    assert_eq!(stale.state(), RecordState::Identified);
    assert!(stale.fields().is_empty());

    let mut writer = items.get(&id).await.expect("get").expect("item");
    writer.set("price", 249.99).expect("set");
    writer.save().await.expect("save");

    stale.set("price", 1).expect("set");
    stale.refresh().await.expect("refresh");

    assert!(!stale.is_dirty());
    assert_eq!(stale.get("price"), Some(&json!(249.99)));
    assert_eq!(stale.get("name"), Some(&json!("large screen")));
}

#[tokio::test]
async fn refresh_keeps_state_of_removed_records() {
    let store = store_with_items().await;
    let items = store.collection::<Items>();

    let mut item = items.all(&[]).await.expect("all").remove(0);
    let before = item.to_json(&SerializeOptions::default());

    items
        .delete(item.key().expect("key"))
        .await
        .expect("delete");
    item.refresh().await.expect("refresh");

    assert_eq!(item.to_json(&SerializeOptions::default()), before);
}

#[tokio::test]
async fn refresh_needs_an_identity() {
    let store = users_store().await;
    let mut user = store
        .collection::<Users>()
        .record_from_json(json!({"firstname": "Ada"}))
        .expect("record");

    let err = user.refresh().await.unwrap_err();
    assert!(matches!(err, MapperError::Construction(message) if message == "id must be provided"));
}

#[tokio::test]
async fn records_from_ids() {
    let store = users_store().await;
    let users = store.collection::<Users>();

    let user = users.record("users/123").expect("record");
    assert_eq!(user.key(), Some("123"));
    assert_eq!(user.id(), Some("users/123"));

    let err = users.record("items/123").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Construction error: string type \"ref\" argument should match the pattern \"users/<string>\". actual: \"items/123\""
    );

    let err = users.record_from_json(json!(42)).unwrap_err();
    assert!(matches!(err, MapperError::Construction(_)));
}

#[tokio::test]
async fn serializes_with_identity_sigils() {
    let store = store_with_items().await;
    let items = store.collection::<Items>();

    let item = items
        .find_by("findByName", ["hard drive"])
        .expect("finder")
        .run()
        .await
        .expect("run")
        .remove(0);
    let raw = items
        .get_raw(item.id().expect("id"))
        .await
        .expect("get")
        .expect("stored");

    let expected: Fields = raw
        .into_iter()
        .map(|(name, value)| match name.as_str() {
            "_id" => ("$id".to_string(), value),
            "_key" => ("$key".to_string(), value),
            _ => (name, value),
        })
        .collect();

    let json = item.to_json(&SerializeOptions::default());
    assert_eq!(json, expected);
    assert_eq!(serde_json::to_value(&item).expect("serialize"), Value::Object(json.clone()));
    assert_eq!(
        serde_json::from_str::<Value>(&item.to_string()).expect("parse"),
        Value::Object(json)
    );

    let json = item.to_json(&SerializeOptions::omit(["price", "$key"]));
    assert!(!json.contains_key("price"));
    assert!(!json.contains_key("$key"));
    assert!(json.contains_key("$id"));
    assert!(json.contains_key("name"));
}

#[tokio::test]
async fn edges_carry_endpoints() {
    let store = users_store().await;
    let users = store.collection::<Users>();
    let owns = store.collection::<Owns>();
    owns.create(CollectionOptions::default())
        .await
        .expect("create owns");

    let mut ada = users.record_from_json(json!({"name": "Ada"})).expect("record");
    ada.save().await.expect("save");
    let mut bob = users.record_from_json(json!({"name": "Bob"})).expect("record");
    bob.save().await.expect("save");

    let from = ada.id().expect("id").to_string();
    let to = bob.id().expect("id").to_string();

    let mut edge = owns
        .record_from_json(json!({"_from": from, "_to": to, "since": 2020}))
        .expect("edge");
    assert_eq!(edge.dirty_fields().collect::<Vec<_>>(), ["since"]);
    assert_eq!(edge.diff().get("_from"), Some(&json!(from)));

    edge.save().await.expect("save edge");

    assert_eq!(edge.state(), RecordState::Identified);
    assert_eq!(edge.from_id(), Some(from.as_str()));
    assert_eq!(edge.to_id(), Some(to.as_str()));

    let json = edge.to_json(&SerializeOptions::default());
    assert_eq!(json.get("$from"), Some(&json!(from)));
    assert_eq!(json.get("$to"), Some(&json!(to)));
    assert_eq!(json.get("since"), Some(&json!(2020)));

    let loaded = owns
        .get(edge.id().expect("id"))
        .await
        .expect("get")
        .expect("edge");
    assert_eq!(loaded.from_id(), Some(from.as_str()));
}

#[tokio::test]
async fn refreshed_edges_learn_their_endpoints() {
    let store = DocumentStore::new(InMemoryStore::new());
    let owns = store.collection::<Owns>();
    owns.create(CollectionOptions::default())
        .await
        .expect("create owns");

    let mut edge = owns
        .record_from_json(json!({"_from": "users/a", "_to": "users/b", "since": 2020}))
        .expect("edge");
    edge.save().await.expect("save edge");

    let mut loaded = owns.record(edge.id().expect("id")).expect("record");
    assert_eq!(loaded.from_id(), None);

    loaded.refresh().await.expect("refresh");

    assert_eq!(loaded.from_id(), Some("users/a"));
    assert_eq!(loaded.to_id(), Some("users/b"));
    assert_eq!(loaded.get("since"), Some(&json!(2020)));

    let json = loaded.to_json(&SerializeOptions::default());
    assert_eq!(json.get("$from"), Some(&json!("users/a")));
    assert_eq!(json.get("$to"), Some(&json!("users/b")));
}

#[tokio::test]
async fn edges_need_endpoints() {
    let store = DocumentStore::new(InMemoryStore::new());
    let owns = store.collection::<Owns>();
    owns.create(CollectionOptions::default())
        .await
        .expect("create owns");

    let mut edge = owns.record_from_json(json!({"since": 2020})).expect("edge");
    let err = edge.save().await.unwrap_err();

    assert!(matches!(err, MapperError::Store(_)));
    assert_eq!(edge.state(), RecordState::Unidentified);
    assert!(edge.is_dirty());
}

struct Accounts;

impl Collection for Accounts {
    fn collection_name() -> &'static str {
        "accounts"
    }

    fn before_save<B: StoreConnector>(
        _record: &Record<'_, B, Self>,
        mut diff: Fields,
    ) -> MapperResult<Fields> {
        diff.remove("password");
        Ok(diff)
    }
}

#[tokio::test]
async fn save_hook_shapes_the_diff() {
    let store = DocumentStore::new(CountingStore::default());
    let accounts = store.collection::<Accounts>();
    accounts
        .create(CollectionOptions::default())
        .await
        .expect("create");

    let mut account = accounts
        .record_from_json(json!({"login": "ada", "password": "secret"}))
        .expect("record");
    account.save().await.expect("save");

    let stored = accounts
        .get_raw(account.id().expect("id"))
        .await
        .expect("get")
        .expect("stored");
    assert_eq!(stored.get("login"), Some(&json!("ada")));
    assert!(!stored.contains_key("password"));

    account.set("password", "changed").expect("set");
    account.save().await.expect("save");
    assert_eq!(store.connector().writes(), 1);
}
