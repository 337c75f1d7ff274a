//! Change-tracked records.
//!
//! A [`Record`] wraps one document of a [`Collection`]: its identity, its user
//! fields, and the set of fields changed since the last save or refresh.
//! Every mutation goes through [`Record::set`], which is the only place the
//! dirty set grows. [`Record::save`] writes exactly the dirty fields.
//!
//! A record is [`RecordState::Unidentified`] until it carries an id, either
//! from construction or from its first successful insert. The transition
//! happens once; identity never changes afterwards.
//!
//! Saves take `&mut self`, so one instance cannot be saved twice at the same
//! time. Two instances of the same stored document are independent: racing
//! saves on them interleave at the store, and ordering them is up to the caller.

use futures::TryStreamExt;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::{collections::BTreeSet, fmt, marker::PhantomData};
use tracing::{debug, trace};

use crate::{
    aql::AqlQuery,
    backend::StoreConnector,
    collection::read_document,
    document::{
        Collection, CollectionKind, FROM, Fields, ID, KEY, RecordRef, TO, is_reserved, json_type,
    },
    error::{MapperError, MapperResult},
};

/// Lifecycle state of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Not persisted yet; saving inserts.
    Unidentified,
    /// Carries an id and key; saving updates.
    Identified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    id: String,
    key: String,
}

/// Options for [`Record::to_json`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Names left out of the output, user fields or `$`-prefixed identity names.
    pub omit: Vec<String>,
}

impl SerializeOptions {
    pub fn omit<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            omit: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// One document of collection `C`, bound to a store connector.
pub struct Record<'a, B, C> {
    connector: &'a B,
    identity: Option<Identity>,
    /// Key requested for the first insert.
    pending_key: Option<String>,
    from: Option<String>,
    to: Option<String>,
    fields: Fields,
    /// Reserved attributes returned by the store, such as `_rev`.
    system: Fields,
    dirty: BTreeSet<String>,
    _collection: PhantomData<fn() -> C>,
}

impl<'a, B, C> Record<'a, B, C>
where
    B: StoreConnector,
    C: Collection,
{
    /// Builds a record from a global id or a field bag.
    ///
    /// A field bag carrying `_id` is taken as stored state and starts clean.
    /// Without `_id`, its user fields start dirty; for edges `_from`/`_to`
    /// are kept as pending endpoints and `_key` as the requested key.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] for an id that is malformed or
    /// belongs to another collection.
    pub(crate) fn new(connector: &'a B, reference: RecordRef) -> MapperResult<Self> {
        let mut record = Record {
            connector,
            identity: None,
            pending_key: None,
            from: None,
            to: None,
            fields: Fields::new(),
            system: Fields::new(),
            dirty: BTreeSet::new(),
            _collection: PhantomData,
        };

        match reference {
            RecordRef::Id(id) => {
                let key = C::key_of(&id)
                    .map_err(|_| {
                        MapperError::Construction(format!(
                            "string type \"ref\" argument should match the pattern \"{}/<string>\". actual: \"{id}\"",
                            C::collection_name()
                        ))
                    })?
                    .to_string();
                record.identity = Some(Identity { id, key });
            }
            RecordRef::Fields(fields) if fields.contains_key(ID) => record.adopt(fields)?,
            RecordRef::Fields(fields) => {
                for (name, value) in fields {
                    match name.as_str() {
                        KEY => record.pending_key = Some(string_attribute(KEY, value)?),
                        FROM if C::kind() == CollectionKind::Edge => {
                            record.from = Some(string_attribute(FROM, value)?)
                        }
                        TO if C::kind() == CollectionKind::Edge => {
                            record.to = Some(string_attribute(TO, value)?)
                        }
                        _ if is_reserved(&name) => {
                            record.system.insert(name, value);
                        }
                        _ => {
                            record.dirty.insert(name.clone());
                            record.fields.insert(name, value);
                        }
                    }
                }
            }
        }

        Ok(record)
    }

    /// Takes over identity, system attributes and user fields from stored state.
    fn adopt(&mut self, document: Fields) -> MapperResult<()> {
        let mut identity_id = None;
        let mut identity_key = None;

        for (name, value) in document {
            match name.as_str() {
                ID => identity_id = Some(string_attribute(ID, value)?),
                KEY => identity_key = Some(string_attribute(KEY, value)?),
                FROM => self.from = Some(string_attribute(FROM, value)?),
                TO => self.to = Some(string_attribute(TO, value)?),
                _ if is_reserved(&name) => {
                    self.system.insert(name, value);
                }
                _ => {
                    self.fields.insert(name, value);
                }
            }
        }

        let id = identity_id.ok_or_else(|| {
            MapperError::Store(format!(
                "document of collection {} has no {ID}",
                C::collection_name()
            ))
        })?;
        let derived = C::key_of(&id)?.to_string();

        self.identity = Some(Identity {
            key: identity_key.unwrap_or(derived),
            id,
        });
        self.pending_key = None;

        Ok(())
    }

    pub fn state(&self) -> RecordState {
        match self.identity {
            Some(_) => RecordState::Identified,
            None => RecordState::Unidentified,
        }
    }

    /// The global id, once identified.
    pub fn id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }

    /// The key, once identified.
    pub fn key(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.key.as_str())
    }

    /// The source id of an edge.
    pub fn from_id(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// The target id of an edge.
    pub fn to_id(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All user fields.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// A reserved attribute returned by the store, e.g. `_rev`.
    pub fn system_attribute(&self, name: &str) -> Option<&Value> {
        self.system.get(name)
    }

    /// Names of the fields changed since the last save or refresh.
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Assigns a user field.
    ///
    /// Returns whether the field became dirty: assigning a value equal to the
    /// current one changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] for a reserved name.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> MapperResult<bool> {
        if is_reserved(field) {
            return Err(MapperError::Construction(format!(
                "cannot assign reserved field \"{field}\""
            )));
        }

        let value = value.into();
        if self
            .fields
            .get(field)
            .is_some_and(|current| same_value(current, &value))
        {
            return Ok(false);
        }

        self.fields.insert(field.to_string(), value);
        self.dirty.insert(field.to_string());
        Ok(true)
    }

    /// The pending write: every dirty field with its current value.
    ///
    /// Before the first insert the requested key and the edge endpoints are
    /// part of the diff as well.
    pub fn diff(&self) -> Fields {
        let mut diff = self
            .dirty
            .iter()
            .filter_map(|field| {
                self.fields
                    .get(field)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect::<Fields>();

        if self.identity.is_none() {
            let pending = [(KEY, &self.pending_key), (FROM, &self.from), (TO, &self.to)];
            for (name, value) in pending {
                if let Some(value) = value {
                    diff.insert(name.to_string(), Value::from(value.as_str()));
                }
            }
        }

        diff
    }

    /// Writes the diff to the store.
    ///
    /// The diff first goes through [`Collection::before_save`]. An empty diff
    /// skips the store entirely. An unidentified record is inserted and adopts
    /// the identity the store assigned; an identified one is updated by key.
    ///
    /// # Errors
    ///
    /// Propagates hook errors and store errors unchanged. On error the dirty
    /// set is left as it was.
    pub async fn save(&mut self) -> MapperResult<&mut Self> {
        let diff = C::before_save(&*self, self.diff())?;

        if diff.is_empty() {
            trace!(collection = C::collection_name(), id = ?self.id(), "nothing to save");
            return Ok(self);
        }

        match self.key().map(str::to_string) {
            None => {
                let query = AqlQuery::insert(C::collection_name(), diff.clone());
                let stored = self
                    .connector
                    .query(query)
                    .await?
                    .try_next()
                    .await?
                    .ok_or_else(|| {
                        MapperError::Store(format!(
                            "insert into {} returned no document",
                            C::collection_name()
                        ))
                    })?;

                match stored {
                    Value::Object(document) => self.adopt(document)?,
                    other => {
                        return Err(MapperError::Store(format!(
                            "insert into {} returned {} instead of a document",
                            C::collection_name(),
                            json_type(&other)
                        )));
                    }
                }

                debug!(collection = C::collection_name(), key = ?self.key(), "inserted record");
            }
            Some(key) => {
                let query = AqlQuery::update(C::collection_name(), &key, diff.clone());
                self.connector
                    .query(query)
                    .await?
                    .try_collect::<Vec<_>>()
                    .await?;

                debug!(
                    collection = C::collection_name(),
                    %key,
                    fields = diff.len(),
                    "updated record"
                );
            }
        }

        self.dirty.clear();
        self.fields.extend(diff.into_iter().filter(|(name, _)| !is_reserved(name)));

        Ok(self)
    }

    /// Re-reads the record from the store.
    ///
    /// User fields and system attributes are replaced by the stored ones and
    /// the dirty set is cleared. Edge endpoints are filled in when the record
    /// does not know them yet. Nothing happens if the record was removed
    /// from the store meanwhile.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] for an unidentified record.
    pub async fn refresh(&mut self) -> MapperResult<&mut Self> {
        let id = self
            .identity
            .as_ref()
            .map(|identity| identity.id.clone())
            .ok_or_else(|| MapperError::Construction("id must be provided".into()))?;

        match read_document::<B, C>(self.connector, &id).await? {
            Some(document) => {
                let mut fields = Fields::new();
                let mut system = Fields::new();

                for (name, value) in document {
                    match name.as_str() {
                        FROM if self.from.is_none() => {
                            self.from = value.as_str().map(str::to_string);
                        }
                        TO if self.to.is_none() => {
                            self.to = value.as_str().map(str::to_string);
                        }
                        ID | KEY | FROM | TO => {}
                        _ if is_reserved(&name) => {
                            system.insert(name, value);
                        }
                        _ => {
                            fields.insert(name, value);
                        }
                    }
                }

                self.fields = fields;
                self.system = system;
                self.dirty.clear();
            }
            None => trace!(collection = C::collection_name(), %id, "refresh target vanished"),
        }

        Ok(self)
    }

    /// Plain field map of the record.
    ///
    /// Holds every user field plus the identity as `$id`, `$key` and, for
    /// edges, `$from`/`$to`. Names listed in `options.omit` are left out.
    pub fn to_json(&self, options: &SerializeOptions) -> Fields {
        let identity = [
            ("$id", self.id()),
            ("$key", self.key()),
            ("$from", self.from_id()),
            ("$to", self.to_id()),
        ];

        self.fields
            .iter()
            .filter(|(name, _)| !is_reserved(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .chain(identity.into_iter().filter_map(|(name, value)| {
                value.map(|value| (name.to_string(), Value::from(value)))
            }))
            .filter(|(name, _)| !options.omit.contains(name))
            .collect()
    }
}

impl<B, C> Serialize for Record<'_, B, C>
where
    B: StoreConnector,
    C: Collection,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json(&SerializeOptions::default()).serialize(serializer)
    }
}

impl<B, C> fmt::Display for Record<'_, B, C>
where
    B: StoreConnector,
    C: Collection,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.to_json(&SerializeOptions::default())))
    }
}

impl<B, C> fmt::Debug for Record<'_, B, C>
where
    C: Collection,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("collection", &C::collection_name())
            .field("identity", &self.identity)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("fields", &self.fields)
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn string_attribute(name: &str, value: Value) -> MapperResult<String> {
    match value {
        Value::String(value) => Ok(value),
        other => Err(MapperError::Construction(format!(
            "\"{name}\" must be a string. Actual: {}",
            json_type(&other)
        ))),
    }
}

/// Strict equality, numbers compared by value (`1` equals `1.0`).
fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| same_value(l, r))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(name, l)| right.get(name).is_some_and(|r| same_value(l, r)))
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_by_value() {
        assert!(same_value(&json!(1), &json!(1.0)));
        assert!(same_value(&json!({ "a": [1, 2.0] }), &json!({ "a": [1.0, 2] })));
        assert!(!same_value(&json!(1), &json!("1")));
        assert!(!same_value(&json!([1]), &json!([1, 1])));
    }

    #[test]
    fn serialize_options_collect_names() {
        let options = SerializeOptions::omit(["price", "$key"]);
        assert_eq!(options.omit, ["price", "$key"]);
    }
}
