//! Outbound collaborators of the pipelines
//!
//! Each is a narrow async trait with one production implementation; tests use
//! the recording doubles in `test_utils`.

pub mod activity;
pub mod dolphin;
pub mod token;
pub mod usecase;

pub use activity::{ActivityService, HttpActivityService};
pub use dolphin::{DolphinMember, DolphinService, HttpDolphinService};
pub use token::{RsaTokenGenerator, TokenGenerator};
pub use usecase::{RepositoryWorkerUsecases, WorkerUsecases};

use std::time::Duration;

use crate::error::{Error, Result};

/// Shared HTTP client for the Activity Service and Dolphin CRM
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("user-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}
