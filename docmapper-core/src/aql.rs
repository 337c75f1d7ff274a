//! Compilation of mapper operations into parameterized AQL.
//!
//! Every operation the mapper sends to a store is an [`AqlQuery`]: the query
//! text, its bind variables, and the typed [`Statement`] it was compiled
//! from. Values and the collection name are always bound, never interpolated.
//! Field names reach the text only after the method-name grammar accepted
//! them as word tokens.

use serde_json::{Value, json};

use crate::{
    document::Fields,
    error::MapperError,
    query::{Filter, Operand, QueryPlan, QueryVisitor, Sort},
};

/// Bind variable holding the collection name (`@@collection` in the text).
pub const COLLECTION_BIND: &str = "@collection";

/// The operation an [`AqlQuery`] performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Method-name driven query.
    Find(QueryPlan),
    /// Every record of the collection, ordered by `sorts`.
    All { sorts: Vec<Sort> },
    /// One record by global id.
    Document { id: String },
    /// Insert returning the stored record.
    Insert { document: Fields },
    /// Partial update of the record with `key`.
    Update { key: String, patch: Fields },
    /// Removal of the record with `key`.
    Remove { key: String },
}

/// A parameterized AQL query ready for a store connector.
#[derive(Debug, Clone, PartialEq)]
pub struct AqlQuery {
    /// Query text.
    pub text: String,
    /// Bind variables referenced by `text`.
    pub bind_vars: Fields,
    /// Target collection.
    pub collection: String,
    /// Typed form of the operation, for connectors that interpret instead of parse.
    pub statement: Statement,
}

impl AqlQuery {
    /// Compiles a method-name driven query.
    ///
    /// Clauses come in a fixed order: filters joined by the connective, then
    /// sorts in declaration order, then the offset/limit window.
    pub fn find(collection: &str, plan: QueryPlan) -> Self {
        let mut compiler = AqlCompiler::default();
        let Ok(filter) = compiler.visit_plan(&plan);

        let mut lines = vec![
            "FOR doc IN @@collection".to_string(),
            format!("  FILTER {filter}"),
        ];

        if !plan.sorts().is_empty() {
            lines.push(format!(
                "  SORT {}",
                plan.sorts()
                    .iter()
                    .map(|sort| format!("doc.{} {}", sort.field, sort.direction.as_aql()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        if let Some(window) = plan.window() {
            lines.push(format!("  LIMIT {}, {}", window.offset, window.count));
        }

        lines.push("  RETURN doc".to_string());

        let mut bind_vars = compiler.bind_vars;
        bind_vars.insert(COLLECTION_BIND.to_string(), Value::from(collection));

        AqlQuery {
            text: lines.join("\n"),
            bind_vars,
            collection: collection.to_string(),
            statement: Statement::Find(plan),
        }
    }

    /// Lists every record, sort fields bound as `@field<n>`.
    pub fn all(collection: &str, sorts: Vec<Sort>) -> Self {
        let mut bind_vars = Fields::new();
        bind_vars.insert(COLLECTION_BIND.to_string(), Value::from(collection));

        let clauses = sorts
            .iter()
            .enumerate()
            .map(|(position, sort)| {
                let bind = format!("field{position}");
                bind_vars.insert(bind.clone(), Value::from(sort.field.as_str()));
                format!("doc[@{bind}] {}", sort.direction.as_aql())
            })
            .collect::<Vec<_>>();

        let text = if clauses.is_empty() {
            "FOR doc IN @@collection RETURN doc".to_string()
        } else {
            format!("FOR doc IN @@collection SORT {} RETURN doc", clauses.join(", "))
        };

        AqlQuery {
            text,
            bind_vars,
            collection: collection.to_string(),
            statement: Statement::All { sorts },
        }
    }

    /// Reads one record, yielding `false` for an id of another collection
    /// and `null` for a missing record.
    pub fn document(collection: &str, id: &str) -> Self {
        AqlQuery {
            text: "RETURN IS_SAME_COLLECTION(@collection, @id) && DOCUMENT(@id)".to_string(),
            bind_vars: bind_vars([("collection", json!(collection)), ("id", json!(id))]),
            collection: collection.to_string(),
            statement: Statement::Document { id: id.to_string() },
        }
    }

    pub fn insert(collection: &str, document: Fields) -> Self {
        AqlQuery {
            text: "INSERT @document INTO @@collection RETURN NEW".to_string(),
            bind_vars: bind_vars([
                (COLLECTION_BIND, json!(collection)),
                ("document", Value::Object(document.clone())),
            ]),
            collection: collection.to_string(),
            statement: Statement::Insert { document },
        }
    }

    pub fn update(collection: &str, key: &str, patch: Fields) -> Self {
        AqlQuery {
            text: "UPDATE @key WITH @patch IN @@collection".to_string(),
            bind_vars: bind_vars([
                (COLLECTION_BIND, json!(collection)),
                ("key", json!(key)),
                ("patch", Value::Object(patch.clone())),
            ]),
            collection: collection.to_string(),
            statement: Statement::Update { key: key.to_string(), patch },
        }
    }

    pub fn remove(collection: &str, key: &str) -> Self {
        AqlQuery {
            text: "REMOVE @key IN @@collection".to_string(),
            bind_vars: bind_vars([(COLLECTION_BIND, json!(collection)), ("key", json!(key))]),
            collection: collection.to_string(),
            statement: Statement::Remove { key: key.to_string() },
        }
    }
}

fn bind_vars<const N: usize>(entries: [(&str, Value); N]) -> Fields {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Compiles a plan's filters into an AQL boolean expression, collecting the
/// bind variables along the way.
#[derive(Debug, Default)]
pub(crate) struct AqlCompiler {
    bind_vars: Fields,
}

impl QueryVisitor for AqlCompiler {
    type Output = String;
    type Error = std::convert::Infallible;

    fn visit_filter(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        let field = format!("doc.{}", filter.field);
        let bind = format!("@{}", filter.bind);

        let expression = match &filter.operand {
            Operand::Pattern(pattern) => {
                self.bind_vars
                    .insert(filter.bind.clone(), Value::from(pattern.source.as_str()));

                let negation = if filter.operator.as_aql().starts_with('!') {
                    "!"
                } else {
                    ""
                };
                format!("{negation}REGEX_TEST({field}, {bind}, {})", pattern.case_insensitive)
            }
            Operand::Value(value) => {
                self.bind_vars.insert(filter.bind.clone(), value.clone());

                let operator = filter.operator.as_aql();
                if filter.is_reversed() {
                    format!("{bind} {operator} {field}")
                } else {
                    format!("{field} {operator} {bind}")
                }
            }
        };

        Ok(expression)
    }

    fn visit_and(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error> {
        Ok(outputs.join(" AND "))
    }

    fn visit_or(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error> {
        Ok(outputs.join(" OR "))
    }
}

impl From<std::convert::Infallible> for MapperError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}
