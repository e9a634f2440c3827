//! The database execution seam.

use tracing::debug;

use crate::{
    compile::{CompiledQuery, DefaultEscaper, Escape},
    error::Result,
    query::Query,
    row::Row,
};

/// Runs compiled queries against a database.
pub trait Executor {
    fn fetch(&self, query: &CompiledQuery) -> Result<Vec<Row>>;

    fn count(&self, query: &CompiledQuery) -> Result<u64>;

    /// Escaper used when a query is rendered with its values inlined.
    fn escaper(&self) -> &dyn Escape {
        &DefaultEscaper
    }

    /// Largest LIMIT the backend accepts. Limits above it, including the
    /// dialect's unbounded limit, are clamped before compiling.
    fn max_limit(&self) -> Option<u64> {
        None
    }
}

impl Query {
    /// Fetches every matching row.
    pub fn get(&self, executor: &dyn Executor) -> Result<Vec<Row>> {
        let compiled = self.compile_for(executor, false)?;
        debug!("fetch: {}", compiled.interpolate(executor.escaper()));
        executor.fetch(&compiled)
    }

    /// Fetches the first matching row.
    pub fn first(&self, executor: &dyn Executor) -> Result<Option<Row>> {
        let rows = self.clone().limit(1).get(executor)?;
        Ok(rows.into_iter().next())
    }

    /// Counts matching rows, ignoring ordering and paging.
    pub fn count(&self, executor: &dyn Executor) -> Result<u64> {
        let compiled = self.compile_for(executor, true)?;
        debug!("count: {}", compiled.interpolate(executor.escaper()));
        executor.count(&compiled)
    }

    fn compile_for(&self, executor: &dyn Executor, count_only: bool) -> Result<CompiledQuery> {
        let Some(max) = executor.max_limit() else {
            return self.compose_query(count_only);
        };
        if self.limit <= max && self.dialect.unbounded_limit() <= max {
            return self.compose_query(count_only);
        }

        let mut clamped = self.clone();
        clamped.limit = clamped.limit.min(max);
        clamped.dialect = clamped.dialect.with_unbounded_limit(max);
        clamped.compose_query(count_only)
    }
}
