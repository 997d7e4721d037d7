//! Data models for user-sync
//!
//! Envelopes and external record shapes on one side, internal Postgres rows
//! on the other, and the pure restructuring functions between them.

pub mod coerce;
pub mod envelope;
pub mod error;
pub mod gws;
pub mod lookup;
pub mod restructure;
pub mod rows;
pub mod shark;

// Re-export commonly used types
pub use envelope::{CdcEnvelope, CdcOp, GwsEnvelope, GwsEventClass, QueuePayload};
pub use error::{ValidationError, ValidationErrorKind, ValidationResult};
pub use gws::{GwsMasterMerchantBank, GwsMerchantData};
pub use restructure::CdcEntity;
pub use rows::*;
