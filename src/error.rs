//! Error handling module for user-sync
//!
//! This module defines the error types used throughout the pipelines. Errors
//! never cross the partition-task boundary: a failed message is logged, handed
//! to the dead-letter sink when one is configured, and its offset is marked.

use thiserror::Error;

/// Result type alias for user-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for user-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing or invalid environment variables)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(String),

    /// Kafka client errors
    #[error("Kafka error: {0}")]
    Kafka(String),

    /// Payload could not be decoded into the expected envelope
    #[error("Decode error: {0}")]
    Decode(String),

    /// Decoded payload is missing data required for the write path
    #[error("Validation error: {0}")]
    Validation(String),

    /// Outbound HTTP call failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Service token could not be produced
    #[error("Auth error: {0}")]
    Auth(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a database error
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Error::Database(msg.into())
    }

    /// Create a Kafka error
    pub fn kafka<S: Into<String>>(msg: S) -> Self {
        Error::Kafka(msg.into())
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Error::Decode(msg.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create an HTTP error
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Error::Http(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Permanent errors will fail again on redelivery (bad payloads).
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Validation(_))
    }

    /// Short machine-readable label, used for dead-letter records and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration_error",
            Error::Database(_) => "database_error",
            Error::Kafka(_) => "kafka_error",
            Error::Decode(_) => "decode_error",
            Error::Validation(_) => "validation_error",
            Error::Http(_) => "http_error",
            Error::Auth(_) => "auth_error",
            Error::Io(_) => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Convert from envconfig::Error to our Error type
impl From<envconfig::Error> for Error {
    fn from(err: envconfig::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<rdkafka::error::KafkaError> for Error {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Error::Kafka(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Auth(err.to_string())
    }
}
