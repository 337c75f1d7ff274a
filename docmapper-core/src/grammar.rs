//! Method-name grammar for finders and sorters.
//!
//! A query is seeded by a *finder* name and ordered by *sorter* names:
//!
//! - `findBy<Field><Comparator?>`, e.g. `findByPriceGreaterThanOrEqual`
//! - `sortBy<Field><Asc|Desc>`, e.g. `sortByNameDesc`
//!
//! Once a query is open, further predicates joined with `and`/`or` use the
//! *continuation* form `<field><Comparator?>`, e.g. `tagsNotContaining`.
//!
//! Parsing is a pure function of the name; it never touches a store.

use regex::Regex;
use std::{fmt, sync::LazyLock};

use crate::{
    error::{MapperError, MapperResult},
    query::{Sort, SortDirection},
};

const COMPARATOR: &str =
    r"(?:Greater|Lesser)Than(?:OrEqual)?|(?:Not)?(?:Equal|Matching|Containing(?:OneOf)?)?";

/// ASCII word characters only; field names end up verbatim in query text.
const WORD: &str = "[0-9A-Za-z_]";

static FINDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^findBy([_A-Z]{WORD}*?)({COMPARATOR})?$"))
        .expect("finder pattern is valid")
});

static CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({WORD}*?)({COMPARATOR})?$")).expect("continuation pattern is valid")
});

static SORTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^sortBy([_A-Z]{WORD}*?)(Asc|Desc)$")).expect("sorter pattern is valid")
});

/// Comparison encoded in the suffix of a finder or continuation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// No suffix, or `Equal`.
    Equal,
    /// `Not` or `NotEqual`.
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LesserThan,
    LesserThanOrEqual,
    /// Regular expression match.
    Matching,
    /// Regular expression mismatch.
    NotMatching,
    /// The record's multi-valued field holds the bound value(s).
    Containing,
    /// The record's multi-valued field holds none of the bound value(s).
    NotContaining,
    /// The record's multi-valued field holds at least one bound value.
    ContainingOneOf,
    /// At least one bound value is missing from the record's multi-valued field.
    NotContainingOneOf,
}

impl Comparator {
    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "" | "Equal" => Comparator::Equal,
            "Not" | "NotEqual" => Comparator::NotEqual,
            "GreaterThan" => Comparator::GreaterThan,
            "GreaterThanOrEqual" => Comparator::GreaterThanOrEqual,
            "LesserThan" => Comparator::LesserThan,
            "LesserThanOrEqual" => Comparator::LesserThanOrEqual,
            "Matching" => Comparator::Matching,
            "NotMatching" => Comparator::NotMatching,
            "Containing" => Comparator::Containing,
            "NotContaining" => Comparator::NotContaining,
            "ContainingOneOf" => Comparator::ContainingOneOf,
            "NotContainingOneOf" => Comparator::NotContainingOneOf,
            _ => return None,
        })
    }

    /// The suffix spelling used in method names.
    pub fn suffix(&self) -> &'static str {
        match self {
            Comparator::Equal => "Equal",
            Comparator::NotEqual => "NotEqual",
            Comparator::GreaterThan => "GreaterThan",
            Comparator::GreaterThanOrEqual => "GreaterThanOrEqual",
            Comparator::LesserThan => "LesserThan",
            Comparator::LesserThanOrEqual => "LesserThanOrEqual",
            Comparator::Matching => "Matching",
            Comparator::NotMatching => "NotMatching",
            Comparator::Containing => "Containing",
            Comparator::NotContaining => "NotContaining",
            Comparator::ContainingOneOf => "ContainingOneOf",
            Comparator::NotContainingOneOf => "NotContainingOneOf",
        }
    }

    /// Whether this comparator needs exactly one bound value.
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            Comparator::GreaterThan
                | Comparator::GreaterThanOrEqual
                | Comparator::LesserThan
                | Comparator::LesserThanOrEqual
                | Comparator::Matching
                | Comparator::NotMatching
        )
    }

    /// Whether the record field is the multi-valued (right-hand) operand.
    pub fn is_reversed(&self) -> bool {
        matches!(
            self,
            Comparator::Containing
                | Comparator::NotContaining
                | Comparator::ContainingOneOf
                | Comparator::NotContainingOneOf
        )
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A parsed filter name: the field it targets and how it compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub comparator: Comparator,
}

/// Parses a `findBy<Field><Comparator?>` name.
///
/// The field token loses its leading capital: `findByFirstName` targets `firstName`.
pub fn parse_finder(name: &str) -> MapperResult<Predicate> {
    let captures = FINDER.captures(name).ok_or_else(|| {
        MapperError::Grammar(format!(
            "method name doesn't match query pattern {}. Actual: \"{name}\"",
            FINDER.as_str()
        ))
    })?;

    predicate(
        name,
        uncapitalize(&captures[1]),
        captures.get(2).map_or("", |m| m.as_str()),
    )
}

/// Parses a `<field><Comparator?>` name used after `and`/`or`.
///
/// The field token is used verbatim.
pub fn parse_continuation(name: &str) -> MapperResult<Predicate> {
    let captures = CONTINUATION.captures(name).ok_or_else(|| {
        MapperError::Grammar(format!(
            "filter name doesn't match pattern {}. Actual: \"{name}\"",
            CONTINUATION.as_str()
        ))
    })?;

    predicate(
        name,
        captures[1].to_string(),
        captures.get(2).map_or("", |m| m.as_str()),
    )
}

/// Parses a `sortBy<Field><Asc|Desc>` name.
pub fn parse_sorter(name: &str) -> MapperResult<Sort> {
    let captures = SORTER.captures(name).ok_or_else(|| {
        MapperError::Grammar(format!(
            "method name doesn't match sort pattern {}. Actual: \"{name}\"",
            SORTER.as_str()
        ))
    })?;

    Ok(Sort {
        field: uncapitalize(&captures[1]),
        direction: match &captures[2] {
            "Asc" => SortDirection::Asc,
            _ => SortDirection::Desc,
        },
    })
}

fn predicate(name: &str, field: String, suffix: &str) -> MapperResult<Predicate> {
    if field.is_empty() {
        return Err(MapperError::Grammar(format!(
            "missing field in method name \"{name}\""
        )));
    }

    let comparator = Comparator::from_suffix(suffix).ok_or_else(|| {
        MapperError::Grammar(format!("unknown comparator \"{suffix}\" in \"{name}\""))
    })?;

    Ok(Predicate { field, comparator })
}

fn uncapitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
