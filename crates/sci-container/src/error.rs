//! Error types for the container crate.

use miette::Diagnostic;
use thiserror::Error;

/// Boxed error returned by user supplied constructors and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while registering or resolving container targets.
#[derive(Error, Diagnostic, Debug)]
pub enum ContainerError {
    #[error("Invalid binding for `{target}`: {reason}")]
    #[diagnostic(
        code(sci_container::invalid_binding),
        help("Bind to an instance, a factory, or a registered class or interface name")
    )]
    InvalidBinding { target: String, reason: String },

    #[error("Invalid alias `{name}`: {reason}")]
    #[diagnostic(
        code(sci_container::invalid_alias),
        help("Aliases need a non-empty name and a non-empty target")
    )]
    InvalidAlias { name: String, reason: String },

    #[error("Cannot resolve `{target}`: {reason}")]
    #[diagnostic(
        code(sci_container::resolution),
        help("Register the class or bind the name before calling `make`")
    )]
    Resolution { target: String, reason: String },

    #[error("Circular dependency detected: {chain}")]
    #[diagnostic(
        code(sci_container::circular),
        help("Break the cycle with a factory binding or a shared instance")
    )]
    CircularDependency { chain: String },

    #[error("Missing argument `{parameter}` for `{class}`")]
    #[diagnostic(
        code(sci_container::missing_argument),
        help("Pass the value in `Args` or declare a default on the parameter")
    )]
    MissingArgument { class: String, parameter: String },

    #[error("Type mismatch for `{context}`: expected {expected}")]
    #[diagnostic(code(sci_container::type_mismatch))]
    TypeMismatch { context: String, expected: String },

    #[error("Unknown method `{method}` on `{class}`")]
    #[diagnostic(
        code(sci_container::unknown_method),
        help("Declare the method in the class descriptor")
    )]
    UnknownMethod { class: String, method: String },

    #[error("Failed to construct `{class}`: {source}")]
    #[diagnostic(code(sci_container::construction))]
    Construction { class: String, source: BoxError },

    #[error("Created hook for `{class}` failed: {source}")]
    #[diagnostic(code(sci_container::hook))]
    Hook { class: String, source: BoxError },
}

impl ContainerError {
    /// Wraps an arbitrary constructor failure.
    pub fn construction<E>(class: impl Into<String>, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Construction {
            class: class.into(),
            source: err.into(),
        }
    }

    pub(crate) fn resolution(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// The name a `Resolution` error failed on.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Resolution { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
