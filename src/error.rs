use crate::value::Value;

/// Error types for sqlx-alias-appender
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// SELECT/FROM could not be located, or a column alias could not be determined
    #[error("Malformed SQL template: {0}")]
    MalformedTemplate(String),

    /// `order_by` was given a name that is not a column alias of the template
    #[error("Unknown column alias '{0}'")]
    UnknownAlias(String),

    /// A result row does not have one value per cached column alias
    #[error("Result row has {actual} columns but the template declares {expected}")]
    ResultShapeMismatch { expected: usize, actual: usize },

    /// Error compiling one of the internal patterns
    #[error("Failed to parse SQL template: {0}")]
    Parse(#[from] regex::Error),

    /// Error from SQLx database operations
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Placeholder appears in the statement but no value was bound for it
    #[error("Placeholder '{0}' has no bound value")]
    UnboundPlaceholder(String),

    /// The COUNT statement returned something other than an integer
    #[error("Count query returned a non-integer value: {0:?}")]
    NonIntegerCount(Value),
}

/// Result type alias for sqlx-alias-appender operations
pub type Result<T> = std::result::Result<T, Error>;
