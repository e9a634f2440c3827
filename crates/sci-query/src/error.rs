//! Error types for sci-query.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum QueryError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(sci_query::invalid_argument),
        help("Check the operator, method name or placeholder count passed to the builder")
    )]
    InvalidArgument(String),

    #[error("Malformed query: {0}")]
    #[diagnostic(
        code(sci_query::malformed),
        help("Balance every `open_group` with a `close_group`, or disable `query.strict_groups`")
    )]
    MalformedQuery(String),

    #[error("Query execution failed: {0}")]
    #[diagnostic(code(sci_query::execution))]
    Execution(String),

    #[error("SQLite error: {0}")]
    #[diagnostic(
        code(sci_query::sqlite),
        help("Set `query.unbounded_limit` to 9223372036854775807 when targeting SQLite")
    )]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to hydrate `{model}`: {reason}")]
    #[diagnostic(code(sci_query::hydration))]
    Hydration { model: String, reason: String },
}

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
