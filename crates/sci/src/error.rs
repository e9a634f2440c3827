//! Unified error type for the framework facade.

use miette::Diagnostic;
use sci_config::ConfigError;
use sci_container::ContainerError;
use sci_query::QueryError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum SciError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error("Failed to install logger: {0}")]
    #[diagnostic(
        code(sci::logging),
        help("A global tracing subscriber can only be installed once per process")
    )]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, SciError>;
