use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(sci_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(sci_config::toml_deserialize),
        help("Check your sci.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists: {0}")]
    #[diagnostic(
        code(sci_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists(String),

    #[error("Primary key column name cannot be empty")]
    #[diagnostic(
        code(sci_config::empty_primary_key),
        help("Set `query.primary_key` to a column name such as \"id\"")
    )]
    EmptyPrimaryKey,

    #[error("Invalid log level: {0}")]
    #[diagnostic(
        code(sci_config::invalid_log_level),
        help("Use one of: trace, debug, info, warn, error")
    )]
    InvalidLogLevel(String),

    #[error("Invalid container resolution depth: {0}")]
    #[diagnostic(
        code(sci_config::invalid_max_depth),
        help("`container.max_depth` must be greater than zero")
    )]
    InvalidMaxDepth(usize),

    #[error("IO error: {0}")]
    #[diagnostic(code(sci_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(sci_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(sci_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
