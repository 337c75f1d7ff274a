//! Index descriptors declared by collections.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    document::Fields,
    error::{MapperError, MapperResult},
};

/// An index as declared by a collection or listed by the store.
///
/// Serializes to `{ "type": ..., "fields": [...], ...options }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index type, e.g. `persistent`, `fulltext`, `geo`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Indexed fields, at least one.
    pub fields: Vec<String>,
    /// Driver-specific options such as `unique` or `sparse`.
    #[serde(flatten)]
    pub options: Fields,
}

impl IndexDescriptor {
    pub fn new<S: Into<String>>(
        kind: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            kind: kind.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            options: Fields::new(),
        }
    }

    /// Adds a driver-specific option.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Whether `other` has the same type and covers the same set of fields.
    ///
    /// Options are not compared.
    pub fn matches(&self, other: &IndexDescriptor) -> bool {
        self.kind == other.kind
            && self.fields.len() == other.fields.len()
            && self.fields.iter().all(|field| other.fields.contains(field))
    }

    /// Checks that the descriptor has a type and at least one field.
    pub fn validate(&self) -> MapperResult<()> {
        if self.kind.is_empty() {
            return Err(MapperError::InvalidIndex(format!(
                "index.type must be a non-empty string. Actual: {self:?}"
            )));
        }

        if self.fields.is_empty() || self.fields.iter().any(String::is_empty) {
            return Err(MapperError::InvalidIndex(format!(
                "index.fields must be a non-empty array of field names. Actual: {:?}",
                self.fields
            )));
        }

        Ok(())
    }
}

/// Returns the declared indexes that have no match among the existing ones.
pub fn missing_indexes<'a>(
    declared: &'a [IndexDescriptor],
    existing: &[IndexDescriptor],
) -> Vec<&'a IndexDescriptor> {
    declared
        .iter()
        .filter(|index| !existing.iter().any(|old| index.matches(old)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_flattened_options() {
        let index =
            IndexDescriptor::new("persistent", ["name", "price"]).with_option("unique", true);

        assert_eq!(
            serde_json::to_value(&index).unwrap(),
            json!({ "type": "persistent", "fields": ["name", "price"], "unique": true })
        );

        let parsed: IndexDescriptor = serde_json::from_value(json!({
            "type": "geo",
            "fields": ["location"],
            "geoJson": true,
        }))
        .unwrap();
        assert_eq!(parsed.kind, "geo");
        assert_eq!(parsed.options.get("geoJson"), Some(&json!(true)));
    }

    #[test]
    fn matching_ignores_field_order_and_options() {
        let declared = IndexDescriptor::new("persistent", ["name", "price"]);
        let existing =
            IndexDescriptor::new("persistent", ["price", "name"]).with_option("unique", true);

        assert!(declared.matches(&existing));
        assert!(!declared.matches(&IndexDescriptor::new("hash", ["name", "price"])));
        assert!(!declared.matches(&IndexDescriptor::new("persistent", ["name"])));
    }

    #[test]
    fn only_missing_indexes_are_reported() {
        let declared = [
            IndexDescriptor::new("persistent", ["name"]),
            IndexDescriptor::new("fulltext", ["description"]),
        ];
        let existing = [
            IndexDescriptor::new("primary", ["_key"]),
            IndexDescriptor::new("persistent", ["name"]),
        ];

        let missing = missing_indexes(&declared, &existing);
        assert_eq!(missing, [&declared[1]]);
    }

    #[test]
    fn validation() {
        assert!(IndexDescriptor::new("persistent", ["name"]).validate().is_ok());
        assert!(IndexDescriptor::new("", ["name"]).validate().is_err());
        assert!(IndexDescriptor::new("persistent", Vec::<String>::new()).validate().is_err());
    }
}
