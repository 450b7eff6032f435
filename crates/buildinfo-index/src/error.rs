//! Error types for index exchanges.

/// Errors raised while building, parsing, or executing index requests.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Query text does not follow the `items.find(...).include(...)` shape.
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// The index could not be reached or refused the request.
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    /// A property write against one entry failed.
    #[error("Failed to set properties on {path}: {reason}")]
    PropertyWrite { path: String, reason: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
