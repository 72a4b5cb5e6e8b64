//! Error types for the meal service.

use thiserror::Error;

/// Main error type for meal service operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Lookup by id or name found nothing
    #[error("Meal not found")]
    NotFound,

    /// A meal with the same name already exists
    #[error("Meal already exists")]
    Conflict,

    /// Request body could not be decoded
    #[error("Invalid JSON: {0}")]
    InvalidInput(String),

    /// The routing key's window is exhausted
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The meals table is gone
    #[error("Table does not exist")]
    MissingTable,

    /// Underlying SQLite failure
    #[error("{0}")]
    Store(#[from] rusqlite::Error),

    /// Malformed seed file
    #[error("Seed error: {0}")]
    Seed(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking store task panicked or was cancelled
    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// HTTP status code this error is reported with.
    ///
    /// Everything the store raises is collapsed to 500; only malformed input
    /// and rate limiting get their own codes.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::InvalidInput(_) => 400,
            ServiceError::RateLimited => 429,
            _ => 500,
        }
    }
}

/// Result type alias for meal service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kinds_collapse_to_500() {
        assert_eq!(ServiceError::NotFound.status_code(), 500);
        assert_eq!(ServiceError::Conflict.status_code(), 500);
        assert_eq!(ServiceError::Seed("bad".into()).status_code(), 500);
    }

    #[test]
    fn test_input_and_rate_limit_codes() {
        assert_eq!(ServiceError::InvalidInput("eof".into()).status_code(), 400);
        assert_eq!(ServiceError::RateLimited.status_code(), 429);
    }

    #[test]
    fn test_messages_match_wire_text() {
        assert_eq!(ServiceError::NotFound.to_string(), "Meal not found");
        assert_eq!(ServiceError::Conflict.to_string(), "Meal already exists");
    }
}
