//! Filter expression building for method-name driven queries.
//!
//! A [`QueryPlan`] accumulates filter triples (field, operator, bound value),
//! the single boolean [`Connective`] joining them, an ordered list of sort keys
//! and an optional offset/limit [`Window`]. Plans are consumed once by a
//! [`QueryVisitor`]: the AQL compiler turns them into query text plus bind
//! variables, an interpreting connector evaluates them directly.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::query::QueryPlan;
//!
//! let plan = QueryPlan::find_by("findByType", ["hardware"])?
//!     .filter(Connective::And, "priceLesserThanOrEqual", [229.99])?
//!     .sort_by("sortByPriceDesc")?
//!     .slice(0, 10)?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::{
    error::{MapperError, MapperResult},
    grammar::{self, Comparator, Predicate},
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    pub fn as_aql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One sort key. The first key of a query is the primary ordering,
/// later keys break ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Boolean operator joining every filter of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_aql(&self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => f.write_str("and"),
            Connective::Or => f.write_str("or"),
        }
    }
}

/// A regular expression given as an explicit (source, case flag) pair.
///
/// Bound to a `Matching`/`NotMatching` comparator it compiles to a
/// `REGEX_TEST` call carrying the flag, instead of the `=~`/`!~` operators
/// used for plain string patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: String,
    pub case_insensitive: bool,
}

impl Pattern {
    /// A case-sensitive pattern.
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), case_insensitive: false }
    }

    /// A case-insensitive pattern.
    pub fn case_insensitive(source: impl Into<String>) -> Self {
        Self { source: source.into(), case_insensitive: true }
    }
}

/// A value supplied to a finder or continuation call.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Value(Value),
    Pattern(Pattern),
}

impl BindValue {
    fn into_value(self) -> Value {
        match self {
            BindValue::Value(value) => value,
            BindValue::Pattern(pattern) => Value::String(pattern.source),
        }
    }
}

impl From<Value> for BindValue {
    fn from(value: Value) -> Self {
        BindValue::Value(value)
    }
}

impl From<Pattern> for BindValue {
    fn from(pattern: Pattern) -> Self {
        BindValue::Pattern(pattern)
    }
}

macro_rules! bind_value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BindValue {
                fn from(value: $ty) -> Self {
                    BindValue::Value(Value::from(value))
                }
            }
        )*
    };
}

bind_value_from!(&str, String, bool, i32, i64, u32, u64, f64);

/// AQL operator a filter compiles to, resolved from the comparator and the
/// number of bound values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    NotLike,
    AllIn,
    NoneIn,
    AnyIn,
    AnyNotIn,
}

impl Operator {
    pub fn as_aql(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "=~",
            Operator::NotLike => "!~",
            Operator::AllIn => "ALL IN",
            Operator::NoneIn => "NONE IN",
            Operator::AnyIn => "ANY IN",
            Operator::AnyNotIn => "ANY NOT IN",
        }
    }

    fn resolve(comparator: Comparator, multiple: bool) -> Self {
        match comparator {
            Comparator::Equal if multiple => Operator::In,
            Comparator::Equal => Operator::Eq,
            Comparator::NotEqual if multiple => Operator::NotIn,
            Comparator::NotEqual => Operator::Ne,
            Comparator::GreaterThan => Operator::Gt,
            Comparator::GreaterThanOrEqual => Operator::Gte,
            Comparator::LesserThan => Operator::Lt,
            Comparator::LesserThanOrEqual => Operator::Lte,
            Comparator::Matching => Operator::Like,
            Comparator::NotMatching => Operator::NotLike,
            Comparator::Containing if multiple => Operator::AllIn,
            Comparator::Containing => Operator::In,
            Comparator::NotContaining if multiple => Operator::NoneIn,
            Comparator::NotContaining => Operator::NotIn,
            Comparator::ContainingOneOf => Operator::AnyIn,
            Comparator::NotContainingOneOf => Operator::AnyNotIn,
        }
    }

    fn takes_list(&self) -> bool {
        matches!(self, Operator::AnyIn | Operator::AnyNotIn)
    }
}

/// The bound side of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Pattern(Pattern),
}

/// One filter triple of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Record field the filter reads.
    pub field: String,
    /// Comparator parsed from the method name.
    pub comparator: Comparator,
    /// Operator resolved from the comparator and the value count.
    pub operator: Operator,
    /// Bound value, never interpolated into query text.
    pub operand: Operand,
    /// Bind parameter name, unique within the query.
    pub bind: String,
}

impl Filter {
    fn new(predicate: Predicate, values: Vec<BindValue>, position: usize) -> MapperResult<Self> {
        let Predicate { field, comparator } = predicate;
        let multiple = values.len() != 1;

        if comparator.is_singular() && multiple {
            return Err(MapperError::Grammar(format!(
                "cannot compare to multiple values with comparator \"{comparator}\""
            )));
        }

        let operator = Operator::resolve(comparator, multiple);
        let operand = if multiple || operator.takes_list() {
            Operand::Value(Value::Array(
                values
                    .into_iter()
                    .map(BindValue::into_value)
                    .collect(),
            ))
        } else {
            match values.into_iter().next() {
                Some(BindValue::Pattern(pattern))
                    if matches!(operator, Operator::Like | Operator::NotLike) =>
                {
                    Operand::Pattern(pattern)
                }
                Some(value) => Operand::Value(value.into_value()),
                None => Operand::Value(Value::Null),
            }
        };

        // The digits after the last `_` are the position, so names never collide.
        let bind = format!("{}_{position}", field.trim_start_matches('_'));

        Ok(Filter { field, comparator, operator, operand, bind })
    }

    /// Whether the record field sits on the right-hand side of the operator.
    pub fn is_reversed(&self) -> bool {
        self.comparator.is_reversed()
    }
}

/// Half-open result window derived from `slice(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub count: u64,
}

impl Window {
    /// Builds the window covering `start..end`.
    ///
    /// # Errors
    ///
    /// Fails when `start` is negative or when `end` is not greater than `start`.
    pub fn from_slice(start: i64, end: i64) -> MapperResult<Self> {
        if start < 0 {
            return Err(MapperError::InvalidBounds(format!(
                "\"start\" argument must be positive. Actual: {start}"
            )));
        }

        if end <= start {
            return Err(MapperError::InvalidBounds(format!(
                "\"end\" must be greater than \"start\". start: {start}, end: {end}"
            )));
        }

        Ok(Window {
            offset: start as u64,
            count: (end - start) as u64,
        })
    }
}

/// An in-progress query: filters, connective, sorts and window.
///
/// A plan always holds at least one filter, seeded by the finder name.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    filters: Vec<Filter>,
    connective: Option<Connective>,
    sorts: Vec<Sort>,
    window: Option<Window>,
}

impl QueryPlan {
    /// Starts a plan from a `findBy…` name and its bound values.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Grammar`] for a malformed name or a value count
    /// the comparator cannot handle.
    pub fn find_by<V: Into<BindValue>>(
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> MapperResult<Self> {
        let filter = Filter::new(
            grammar::parse_finder(name)?,
            values.into_iter().map(Into::into).collect(),
            0,
        )?;

        Ok(QueryPlan {
            filters: vec![filter],
            connective: None,
            sorts: Vec::new(),
            window: None,
        })
    }

    /// Fixes the connective of this plan.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::MixedConnective`] if the other connective was set before.
    pub fn connect(mut self, connective: Connective) -> MapperResult<Self> {
        match self.connective {
            Some(current) if current != connective => Err(MapperError::MixedConnective),
            _ => {
                self.connective = Some(connective);
                Ok(self)
            }
        }
    }

    /// Adds a filter from a continuation name, joined with `connective`.
    pub fn filter<V: Into<BindValue>>(
        self,
        connective: Connective,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> MapperResult<Self> {
        let mut plan = self.connect(connective)?;
        plan.push_filter(name, values.into_iter().map(Into::into).collect())?;
        Ok(plan)
    }

    pub(crate) fn push_filter(&mut self, name: &str, values: Vec<BindValue>) -> MapperResult<()> {
        let filter = Filter::new(
            grammar::parse_continuation(name)?,
            values,
            self.filters.len(),
        )?;
        self.filters.push(filter);
        Ok(())
    }

    /// Appends a sort key from a `sortBy…` name.
    pub fn sort_by(mut self, name: &str) -> MapperResult<Self> {
        self.sorts.push(grammar::parse_sorter(name)?);
        Ok(self)
    }

    /// Restricts results to the zero-based, end-exclusive range `start..end`.
    pub fn slice(mut self, start: i64, end: i64) -> MapperResult<Self> {
        self.window = Some(Window::from_slice(start, end)?);
        Ok(self)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// The connective in effect; a single-filter plan behaves as a conjunction.
    pub fn connective(&self) -> Connective {
        self.connective.unwrap_or(Connective::And)
    }

    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }
}

/// Visitor over a [`QueryPlan`]'s filter list.
///
/// Implemented by the AQL compiler and by interpreting connectors.
pub trait QueryVisitor {
    type Output;
    type Error: Into<MapperError>;

    fn visit_filter(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error>;
    fn visit_and(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error>;

    fn visit_plan(&mut self, plan: &QueryPlan) -> Result<Self::Output, Self::Error> {
        let outputs = plan
            .filters()
            .iter()
            .map(|filter| self.visit_filter(filter))
            .collect::<Result<Vec<_>, _>>()?;

        match plan.connective() {
            Connective::And => self.visit_and(outputs),
            Connective::Or => self.visit_or(outputs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn singular_comparators_need_exactly_one_value() {
        for name in [
            "findByPriceGreaterThan",
            "findByPriceGreaterThanOrEqual",
            "findByPriceLesserThan",
            "findByPriceLesserThanOrEqual",
            "findByNameMatching",
            "findByNameNotMatching",
        ] {
            let suffix = name.trim_start_matches("findByPrice").trim_start_matches("findByName");
            let expected = format!(
                "Grammar error: cannot compare to multiple values with comparator \"{suffix}\""
            );

            let none = QueryPlan::find_by(name, Vec::<BindValue>::new()).unwrap_err();
            assert_eq!(none.to_string(), expected);

            let many = QueryPlan::find_by(name, [229.99, 999.99]).unwrap_err();
            assert_eq!(many.to_string(), expected);

            assert!(QueryPlan::find_by(name, [1]).is_ok(), "{name}");
        }
    }

    #[test]
    fn singular_comparators_are_checked_on_continuations() {
        let plan = QueryPlan::find_by("findByType", ["hardware"]).unwrap();
        let err = plan
            .filter(Connective::And, "priceGreaterThan", Vec::<BindValue>::new())
            .unwrap_err();
        assert!(matches!(err, MapperError::Grammar(_)));
    }

    #[test]
    fn operators_follow_value_count() {
        let cases: [(&str, Vec<BindValue>, Operator, Value); 10] = [
            ("findByName", vec!["a".into()], Operator::Eq, json!("a")),
            ("findByName", vec!["a".into(), "b".into()], Operator::In, json!(["a", "b"])),
            ("findByName", vec![], Operator::In, json!([])),
            ("findByNameNot", vec!["a".into()], Operator::Ne, json!("a")),
            ("findByNameNotEqual", vec![], Operator::NotIn, json!([])),
            ("findByTagsContaining", vec!["hifi".into()], Operator::In, json!("hifi")),
            (
                "findByTagsContaining",
                vec!["hifi".into(), "display".into()],
                Operator::AllIn,
                json!(["hifi", "display"]),
            ),
            ("findByTagsNotContaining", vec!["hifi".into()], Operator::NotIn, json!("hifi")),
            ("findByTagsContainingOneOf", vec!["hifi".into()], Operator::AnyIn, json!(["hifi"])),
            (
                "findByTagsNotContainingOneOf",
                vec!["a".into(), "b".into()],
                Operator::AnyNotIn,
                json!(["a", "b"]),
            ),
        ];

        for (name, values, operator, operand) in cases {
            let plan = QueryPlan::find_by(name, values).unwrap();
            let filter = &plan.filters()[0];
            assert_eq!(filter.operator, operator, "{name}");
            assert_eq!(filter.operand, Operand::Value(operand), "{name}");
        }
    }

    #[test]
    fn pattern_values_are_kept_for_regex_comparators_only() {
        let plan =
            QueryPlan::find_by("findByNameMatching", [Pattern::case_insensitive(r"\sscre\w+")])
                .unwrap();
        assert_eq!(
            plan.filters()[0].operand,
            Operand::Pattern(Pattern::case_insensitive(r"\sscre\w+"))
        );

        let plan = QueryPlan::find_by("findByName", [Pattern::new("x")]).unwrap();
        assert_eq!(plan.filters()[0].operand, Operand::Value(json!("x")));
    }

    #[test]
    fn bind_names_are_unique_per_filter() {
        let plan = QueryPlan::find_by("findByPriceGreaterThan", [10])
            .unwrap()
            .filter(Connective::And, "priceLesserThan", [20])
            .unwrap()
            .filter(Connective::And, "_key", ["k"])
            .unwrap();

        let binds = plan
            .filters()
            .iter()
            .map(|filter| filter.bind.as_str())
            .collect::<Vec<_>>();
        assert_eq!(binds, ["price_0", "price_1", "key_2"]);
    }

    #[test]
    fn digit_suffixed_fields_keep_distinct_binds() {
        let mut plan = QueryPlan::find_by("findByA1", [1]).unwrap();
        for _ in 0..9 {
            plan = plan.filter(Connective::And, "name", ["x"]).unwrap();
        }
        plan = plan.filter(Connective::And, "a", [2]).unwrap();

        let binds = plan
            .filters()
            .iter()
            .map(|filter| filter.bind.as_str())
            .collect::<Vec<_>>();
        assert_eq!(binds[0], "a1_0");
        assert_eq!(binds[10], "a_10");

        let unique = binds.iter().collect::<std::collections::BTreeSet<_>>();
        assert_eq!(unique.len(), binds.len());
    }

    #[test]
    fn connective_cannot_be_mixed() {
        for (first, second) in [
            (Connective::And, Connective::Or),
            (Connective::Or, Connective::And),
        ] {
            let plan = QueryPlan::find_by("findByType", ["hardware"])
                .unwrap()
                .filter(first, "name", ["large screen"])
                .unwrap();

            let err = plan.filter(second, "name", ["hard drive"]).unwrap_err();
            assert!(matches!(err, MapperError::MixedConnective));
            assert_eq!(err.to_string(), "cannot mix logical operators \"and\" and \"or\"");
        }
    }

    #[test]
    fn same_connective_can_repeat() {
        let plan = QueryPlan::find_by("findByType", ["hardware"])
            .unwrap()
            .filter(Connective::Or, "name", ["a"])
            .unwrap()
            .filter(Connective::Or, "name", ["b"])
            .unwrap();

        assert_eq!(plan.connective(), Connective::Or);
        assert_eq!(plan.filters().len(), 3);
    }

    #[test]
    fn sorts_keep_declaration_order() {
        let plan = QueryPlan::find_by("findByType", ["hardware"])
            .unwrap()
            .sort_by("sortByTypeAsc")
            .unwrap()
            .sort_by("sortByPriceDesc")
            .unwrap();

        assert_eq!(
            plan.sorts(),
            [
                Sort { field: "type".into(), direction: SortDirection::Asc },
                Sort { field: "price".into(), direction: SortDirection::Desc },
            ]
        );
    }

    #[test]
    fn slice_bounds() {
        assert_eq!(
            Window::from_slice(1, 3).unwrap(),
            Window { offset: 1, count: 2 }
        );

        assert_eq!(
            Window::from_slice(-1, 2).unwrap_err().to_string(),
            "Invalid bounds: \"start\" argument must be positive. Actual: -1"
        );
        assert_eq!(
            Window::from_slice(1, -2).unwrap_err().to_string(),
            "Invalid bounds: \"end\" must be greater than \"start\". start: 1, end: -2"
        );
        assert_eq!(
            Window::from_slice(0, 0).unwrap_err().to_string(),
            "Invalid bounds: \"end\" must be greater than \"start\". start: 0, end: 0"
        );
    }
}
