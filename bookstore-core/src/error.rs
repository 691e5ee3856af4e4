// bookstore-core/src/error.rs
// Error taxonomy for the query runner

use mongodb::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookstoreError {
    /// The database could not be reached or opened
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// The database rejected an individual operation
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Aggregation error: {0}")]
    Aggregation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BookstoreError {
    /// Connection failures abort before any operation runs; every other
    /// variant is an operation-level database error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, BookstoreError::Connection(_))
    }
}

impl From<serde_json::Error> for BookstoreError {
    fn from(err: serde_json::Error) -> Self {
        BookstoreError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BookstoreError {
    fn from(err: toml::de::Error) -> Self {
        BookstoreError::Config(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for BookstoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        BookstoreError::Serialization(err.to_string())
    }
}

impl From<mongodb::error::Error> for BookstoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
                BookstoreError::Connection(err.to_string())
            }
            ErrorKind::InvalidArgument { .. } => BookstoreError::InvalidQuery(err.to_string()),
            _ => BookstoreError::Database(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookstoreError>;
