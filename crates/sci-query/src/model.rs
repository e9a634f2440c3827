//! Active-record style models and queries that hydrate them.

use std::marker::PhantomData;

use crate::{
    dialect::Dialect,
    error::Result,
    executor::Executor,
    query::Query,
    row::Row,
    value::SqlValue,
};

/// A domain type stored in one table.
///
/// ```ignore
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl Model for User {
///     const TABLE: &'static str = "users";
///
///     fn hydrate(row: &Row) -> Result<Self> {
///         Ok(Self {
///             id: row.get("id")?,
///             name: row.get("name")?,
///         })
///     }
/// }
///
/// let adults = User::query()
///     .filter(|q| q.where_(("age", ">=", 18)))
///     .get(&executor)?;
/// ```
pub trait Model: Sized {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    fn hydrate(row: &Row) -> Result<Self>;

    fn query() -> ModelQuery<Self> {
        ModelQuery::new()
    }
}

/// A [`Query`] bound to a model; results come back hydrated.
#[derive(Clone, Debug)]
pub struct ModelQuery<M> {
    query: Query,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Default for ModelQuery<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> ModelQuery<M> {
    pub fn new() -> Self {
        Self {
            query: Query::table(M::TABLE).primary_key(M::PRIMARY_KEY),
            _model: PhantomData,
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.query = self.query.dialect(dialect);
        self
    }

    /// Applies builder calls to the underlying query.
    pub fn filter(mut self, f: impl FnOnce(Query) -> Query) -> Self {
        self.query = f(self.query);
        self
    }

    pub fn as_query(&self) -> &Query {
        &self.query
    }

    pub fn into_query(self) -> Query {
        self.query
    }

    pub fn get(&self, executor: &dyn Executor) -> Result<Vec<M>> {
        self.query
            .get(executor)?
            .iter()
            .map(M::hydrate)
            .collect()
    }

    pub fn first(&self, executor: &dyn Executor) -> Result<Option<M>> {
        self.query
            .first(executor)?
            .as_ref()
            .map(M::hydrate)
            .transpose()
    }

    /// Looks a record up by primary key.
    pub fn find(&self, executor: &dyn Executor, key: impl Into<SqlValue>) -> Result<Option<M>> {
        let query = self.query.clone().where_((M::PRIMARY_KEY, key.into()));
        query
            .first(executor)?
            .as_ref()
            .map(M::hydrate)
            .transpose()
    }

    pub fn count(&self, executor: &dyn Executor) -> Result<u64> {
        self.query.count(executor)
    }
}
