//! Error types for the permission engine

use thiserror::Error;

/// Permission engine errors
///
/// None of these represent a denial. A missing grant is always a plain
/// `false`; these variants are configuration or caller mistakes.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A `$`-prefixed value token other than `$current_user`
    #[error("Unknown permission variable: {0}")]
    UnknownPermissionVariable(String),

    /// A bare resource type was queried without an explicit context
    #[error("If resource type '{0}' is given as a string, the context must be explicit")]
    AmbiguousContextQuery(String),

    /// A multi-action check was built without any action
    #[error("Must specify at least one action")]
    MissingAction,

    /// The grant payload does not have the expected shape
    #[error("Invalid grant payload: {0}")]
    InvalidGrantPayload(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for permission operations
pub type Result<T> = std::result::Result<T, AuthzError>;
