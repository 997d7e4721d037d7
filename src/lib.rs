//! user-sync library
//!
//! This library exposes the pipelines of user-sync for use in integration
//! tests and by the `user-sync` binary.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod kafka;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod topics;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use topics::TopicRegistry;

// Re-export pipeline types
pub use kafka::{ConsumerGroupRunner, RunnerState, TopicRouter};
pub use pipeline::{build_pipelines, PgRepositories, Pipeline, RepositoryProvider, Services};

// Re-export model types
pub use models::{ValidationError, ValidationErrorKind};
