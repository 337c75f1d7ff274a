//! Core traits and types binding record types to store collections.
//!
//! A [`Collection`] is usually a unit marker type: it names the store-side
//! collection, tells whether it holds documents or edges, declares indexes and
//! optionally hooks into saves. Records of that collection are then handled
//! through [`Record`](crate::record::Record).
//!
//! # Example
//!
//! ```ignore
//! use docmapper::document::{Collection, CollectionKind};
//!
//! pub struct Users;
//!
//! impl Collection for Users {
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//!
//! pub struct Follows;
//!
//! impl Collection for Follows {
//!     fn collection_name() -> &'static str {
//!         "follows"
//!     }
//!
//!     fn kind() -> CollectionKind {
//!         CollectionKind::Edge
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    backend::StoreConnector,
    error::{MapperError, MapperResult},
    index::IndexDescriptor,
    record::Record,
};

/// A bag of named field values, as read from or written to the store.
pub type Fields = Map<String, Value>;

/// Store attribute holding the global id (`<collection>/<key>`).
pub const ID: &str = "_id";
/// Store attribute holding the key, unique within a collection.
pub const KEY: &str = "_key";
/// Store attribute holding an edge's source id.
pub const FROM: &str = "_from";
/// Store attribute holding an edge's target id.
pub const TO: &str = "_to";

const RESERVED_PREFIXES: [char; 2] = ['_', '$'];
const RESERVED_FIELDS: [&str; 2] = ["to_json", "to_string"];

/// Whether `field` is reserved and therefore never a user field.
///
/// Names starting with `_` or `$` are store or mapper attributes; `to_json`
/// and `to_string` collide with the record serialization methods.
pub fn is_reserved(field: &str) -> bool {
    field.starts_with(RESERVED_PREFIXES) || RESERVED_FIELDS.contains(&field)
}

/// Kind of store collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Plain documents.
    #[default]
    Document,
    /// Edges carrying `_from` and `_to` endpoint ids.
    Edge,
}

/// Binds a record type to a store collection.
///
/// Only [`collection_name`](Collection::collection_name) is required; the
/// other items have defaults. The trait is implemented by hand or with
/// `#[derive(Collection)]`.
pub trait Collection: Sized + Send + Sync + 'static {
    /// Returns the name of the collection in the store.
    fn collection_name() -> &'static str;

    /// Returns the kind of the collection.
    fn kind() -> CollectionKind {
        CollectionKind::Document
    }

    /// Returns the indexes this collection should carry.
    ///
    /// An empty list means no index management.
    fn indexes() -> Vec<IndexDescriptor> {
        Vec::new()
    }

    /// Called by [`Record::save`] with the pending diff before it is written.
    ///
    /// The returned map is what gets written; returning an empty map turns
    /// the save into a no-op.
    fn before_save<B: StoreConnector>(
        _record: &Record<'_, B, Self>,
        diff: Fields,
    ) -> MapperResult<Fields> {
        Ok(diff)
    }

    /// Validates that `id` is a global id of this collection and returns its key.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] when `id` is malformed or belongs
    /// to another collection.
    fn key_of(id: &str) -> MapperResult<&str> {
        match split_id(id) {
            Some((collection, key)) if collection == Self::collection_name() => Ok(key),
            _ => Err(MapperError::Construction(format!(
                "id must match the pattern \"{}/<key>\". Actual: \"{id}\"",
                Self::collection_name()
            ))),
        }
    }

    /// Accepts either a key or a global id of this collection and returns the key.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Construction`] for an empty reference or an id
    /// from another collection.
    fn key_from_id(reference: &str) -> MapperResult<&str> {
        if reference.is_empty() {
            return Err(MapperError::Construction("id or key must be provided".into()));
        }

        match split_id(reference) {
            Some(_) => Self::key_of(reference),
            None => Ok(reference),
        }
    }

    /// Builds the global id of `key` in this collection.
    fn id_of(key: &str) -> String {
        format!("{}/{key}", Self::collection_name())
    }
}

/// Splits a global id into its collection and key segments.
///
/// The collection segment must be a non-empty word, the key non-empty.
pub fn split_id(id: &str) -> Option<(&str, &str)> {
    let (collection, key) = id.split_once('/')?;

    let word = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_');

    (word && !key.is_empty()).then_some((collection, key))
}

/// What a record is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordRef {
    /// A global id of an existing record.
    Id(String),
    /// A field bag, carrying identity attributes when it came from the store.
    Fields(Fields),
}

impl From<&str> for RecordRef {
    fn from(id: &str) -> Self {
        RecordRef::Id(id.to_string())
    }
}

impl From<String> for RecordRef {
    fn from(id: String) -> Self {
        RecordRef::Id(id)
    }
}

impl From<Fields> for RecordRef {
    fn from(fields: Fields) -> Self {
        RecordRef::Fields(fields)
    }
}

impl TryFrom<Value> for RecordRef {
    type Error = MapperError;

    fn try_from(value: Value) -> MapperResult<Self> {
        match value {
            Value::String(id) => Ok(RecordRef::Id(id)),
            Value::Object(fields) => Ok(RecordRef::Fields(fields)),
            other => Err(MapperError::Construction(format!(
                "\"ref\" argument type could only be one of string, object. actual: {}",
                json_type(&other)
            ))),
        }
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
