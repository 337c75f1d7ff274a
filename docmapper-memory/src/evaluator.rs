//! Query plan evaluation for in-memory document filtering.
//!
//! Values are compared the way AQL compares them: first by type rank
//! (`null < bool < number < string < array < object`), then by value.
//! Missing attributes read as `null`.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use docmapper_core::{
    document::Fields,
    error::{MapperError, MapperResult},
    query::{Filter, Operand, Operator, QueryPlan, QueryVisitor, Sort, SortDirection},
};

/// Borrowed, comparable view of a JSON value.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    /// All numbers normalized to f64.
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Object(BTreeMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => Comparable::Number(value.as_f64().unwrap_or(0.0)),
            Value::String(value) => Comparable::String(value),
            Value::Array(array) => Comparable::Array(
                array
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Value::Object(object) => Comparable::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<BTreeMap<_, _>>()
            ),
        }
    }
}

impl<'a> From<Option<&'a Value>> for Comparable<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        value.map_or(Comparable::Null, Comparable::from)
    }
}

impl Comparable<'_> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Object(_) => 5,
        }
    }

    /// Total order over all values.
    pub(crate) fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b)
                .map(|(a, b)| a.compare(b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Object(a), Comparable::Object(b)) => a
                .iter()
                .zip(b)
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.compare(vb)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Membership of `self` in `haystack`; a non-array haystack holds nothing.
    fn is_in(&self, haystack: &Comparable<'_>) -> bool {
        match haystack {
            Comparable::Array(items) => items.iter().any(|item| item == self),
            _ => false,
        }
    }

    fn elements(&self) -> &[Comparable<'_>] {
        match self {
            Comparable::Array(items) => items,
            _ => &[],
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

/// Regular expressions of a plan, compiled once per query and keyed by bind name.
pub(crate) fn compile_patterns(plan: &QueryPlan) -> MapperResult<HashMap<String, Regex>> {
    plan.filters()
        .iter()
        .filter(|filter| matches!(filter.operator, Operator::Like | Operator::NotLike))
        .map(|filter| {
            let (source, case_insensitive) = match &filter.operand {
                Operand::Pattern(pattern) => (pattern.source.as_str(), pattern.case_insensitive),
                Operand::Value(Value::String(source)) => (source.as_str(), false),
                Operand::Value(other) => {
                    return Err(MapperError::Store(format!(
                        "regular expression for {} must be a string. Actual: {other}",
                        filter.field
                    )));
                }
            };

            let regex = RegexBuilder::new(source)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|err| {
                    MapperError::Store(format!("invalid regular expression \"{source}\": {err}"))
                })?;

            Ok((filter.bind.clone(), regex))
        })
        .collect()
}

/// Evaluates a plan's filters against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Fields,
    patterns: &'a HashMap<String, Regex>,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Fields, patterns: &'a HashMap<String, Regex>) -> Self {
        Self { document, patterns }
    }

    pub fn evaluate(&mut self, plan: &QueryPlan) -> MapperResult<bool> {
        self.visit_plan(plan)
    }

    fn regex_test(&self, filter: &Filter, field: &Comparable<'_>) -> bool {
        match (self.patterns.get(&filter.bind), field) {
            (Some(regex), Comparable::String(text)) => regex.is_match(text),
            _ => false,
        }
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = MapperError;

    fn visit_filter(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        let field = Comparable::from(self.document.get(&filter.field));
        let operand = match &filter.operand {
            Operand::Value(value) => Comparable::from(value),
            Operand::Pattern(_) => Comparable::Null,
        };

        let reversed = filter.is_reversed();

        Ok(match filter.operator {
            Operator::Eq => field == operand,
            Operator::Ne => field != operand,
            Operator::Gt => field > operand,
            Operator::Gte => field >= operand,
            Operator::Lt => field < operand,
            Operator::Lte => field <= operand,
            Operator::In if reversed => operand.is_in(&field),
            Operator::In => field.is_in(&operand),
            Operator::NotIn if reversed => !operand.is_in(&field),
            Operator::NotIn => !field.is_in(&operand),
            Operator::Like => self.regex_test(filter, &field),
            Operator::NotLike => !self.regex_test(filter, &field),
            Operator::AllIn => operand.elements().iter().all(|value| value.is_in(&field)),
            Operator::NoneIn => !operand.elements().iter().any(|value| value.is_in(&field)),
            Operator::AnyIn => operand.elements().iter().any(|value| value.is_in(&field)),
            Operator::AnyNotIn => operand.elements().iter().any(|value| !value.is_in(&field)),
        })
    }

    fn visit_and(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error> {
        Ok(outputs.into_iter().all(|output| output))
    }

    fn visit_or(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error> {
        Ok(outputs.into_iter().any(|output| output))
    }
}

/// Keeps the documents matching the plan's filters, in their given order.
pub(crate) fn filter_documents<'d>(
    documents: impl IntoIterator<Item = &'d Fields>,
    plan: &QueryPlan,
    patterns: &HashMap<String, Regex>,
) -> MapperResult<Vec<&'d Fields>> {
    let mut matched = Vec::new();

    for document in documents {
        if DocumentEvaluator::new(document, patterns).evaluate(plan)? {
            matched.push(document);
        }
    }

    Ok(matched)
}

/// Orders documents by the given keys; ties keep their previous order.
pub(crate) fn sort_documents(documents: &mut [&Fields], sorts: &[Sort]) {
    documents.sort_by(|a, b| {
        sorts
            .iter()
            .map(|sort| {
                let left = Comparable::from(a.get(&sort.field));
                let right = Comparable::from(b.get(&sort.field));

                match sort.direction {
                    SortDirection::Asc => left.compare(&right),
                    SortDirection::Desc => right.compare(&left),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}
