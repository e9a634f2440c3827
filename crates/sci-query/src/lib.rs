//! Fluent SQL query builder.
//!
//! A [`Query`] accumulates projection, source, join and WHERE clauses and
//! compiles them into a [`CompiledQuery`]: SQL text with placeholders plus
//! the ordered values bound to them. Execution goes through the
//! [`Executor`] trait; [`SqliteExecutor`] is the bundled implementation.

mod clause;
mod compile;
mod dialect;
mod error;
mod executor;
mod model;
mod query;
mod row;
mod sqlite;
mod value;

pub use clause::{ClauseOptions, Joiner, MatchMode, Operator, Pattern, Predicate, Predicates};
pub use compile::{CompiledQuery, DefaultEscaper, Escape};
pub use dialect::Dialect;
pub use error::{QueryError, Result};
pub use executor::Executor;
pub use model::{Model, ModelQuery};
pub use query::{Direction, JoinKind, Query};
pub use row::Row;
pub use sqlite::SqliteExecutor;
pub use value::SqlValue;
