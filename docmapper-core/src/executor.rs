//! Call-chain query builder and executor.
//!
//! A [`Query`] is opened by [`TypedCollection::find_by`] and extended in
//! three ways:
//!
//! - [`Query::and`] / [`Query::or`] return a [`BooleanExpression`] that adds
//!   exactly one more filter from a continuation name and hands the query back
//! - [`Query::sort_by`] appends a sort key from a `sortBy…` name
//! - [`Query::slice`] sets the result window
//!
//! [`Query::run`] sends the compiled query in a single round trip and wraps
//! every result into a [`Record`].
//!
//! ```ignore
//! let items = store
//!     .collection::<Items>()
//!     .find_by("findByType", ["hardware"])?
//!     .and()?
//!     .filter("priceLesserThanOrEqual", [229.99])?
//!     .sort_by("sortByNameAsc")?
//!     .slice(0, 10)?
//!     .run()
//!     .await?;
//! ```

use std::fmt;
use tracing::debug;

use crate::{
    aql::AqlQuery,
    backend::StoreConnector,
    collection::TypedCollection,
    document::Collection,
    error::MapperResult,
    query::{BindValue, Connective, QueryPlan},
    record::Record,
};

/// An open query on collection `C`.
pub struct Query<'a, B, C> {
    collection: TypedCollection<'a, B, C>,
    plan: QueryPlan,
}

impl<B, C: Collection> fmt::Debug for Query<'_, B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("collection", &C::collection_name())
            .field("plan", &self.plan)
            .finish()
    }
}

impl<'a, B, C> Query<'a, B, C>
where
    B: StoreConnector,
    C: Collection,
{
    pub(crate) fn new(collection: TypedCollection<'a, B, C>, plan: QueryPlan) -> Self {
        Self { collection, plan }
    }

    /// Joins the next filter with a conjunction.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::MixedConnective`](crate::error::MapperError::MixedConnective)
    /// if [`or`](Self::or) was used on this query before.
    pub fn and(self) -> MapperResult<BooleanExpression<'a, B, C>> {
        self.connect(Connective::And)
    }

    /// Joins the next filter with a disjunction.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::MixedConnective`](crate::error::MapperError::MixedConnective)
    /// if [`and`](Self::and) was used on this query before.
    pub fn or(self) -> MapperResult<BooleanExpression<'a, B, C>> {
        self.connect(Connective::Or)
    }

    fn connect(self, connective: Connective) -> MapperResult<BooleanExpression<'a, B, C>> {
        Ok(BooleanExpression {
            query: Query {
                collection: self.collection,
                plan: self.plan.connect(connective)?,
            },
        })
    }

    /// Appends a sort key from a `sortBy<Field><Asc|Desc>` name.
    ///
    /// The first sort key is the primary ordering, later ones break ties.
    pub fn sort_by(self, name: &str) -> MapperResult<Self> {
        Ok(Query {
            plan: self.plan.sort_by(name)?,
            ..self
        })
    }

    /// Restricts the results to the zero-based range `start..end`.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::InvalidBounds`](crate::error::MapperError::InvalidBounds)
    /// unless `0 <= start < end`.
    pub fn slice(self, start: i64, end: i64) -> MapperResult<Self> {
        Ok(Query {
            plan: self.plan.slice(start, end)?,
            ..self
        })
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// Compiles the query without running it.
    pub fn compile(&self) -> AqlQuery {
        AqlQuery::find(C::collection_name(), self.plan.clone())
    }

    /// Runs the query and returns the matching records.
    ///
    /// # Errors
    ///
    /// Propagates store errors unchanged.
    pub async fn run(self) -> MapperResult<Vec<Record<'a, B, C>>> {
        let query = AqlQuery::find(C::collection_name(), self.plan);

        debug!(
            collection = C::collection_name(),
            query = %query.text,
            binds = query.bind_vars.len(),
            "running query"
        );

        self.collection.fetch(query).await
    }
}

/// A query waiting for the filter that follows `and`/`or`.
pub struct BooleanExpression<'a, B, C> {
    query: Query<'a, B, C>,
}

impl<B, C: Collection> fmt::Debug for BooleanExpression<'_, B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BooleanExpression")
            .field("query", &self.query)
            .finish()
    }
}

impl<'a, B, C> BooleanExpression<'a, B, C>
where
    B: StoreConnector,
    C: Collection,
{
    /// Adds a filter from a `<field><Comparator?>` name.
    ///
    /// The field is taken verbatim: `priceLesserThan` filters on `price`.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Grammar`](crate::error::MapperError::Grammar)
    /// for a malformed name or an unsupported value count.
    pub fn filter<V: Into<BindValue>>(
        self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> MapperResult<Query<'a, B, C>> {
        let mut query = self.query;
        query
            .plan
            .push_filter(name, values.into_iter().map(Into::into).collect())?;
        Ok(query)
    }
}
