//! Validation error types for restructured records
//!
//! A record that decodes fine can still be unusable: a CDC delete without a
//! pre-image, a merchant without an id. These errors are permanent and are
//! kept separate from the general application errors.

use std::fmt;
use thiserror::Error;

/// Main validation error type
#[derive(Error, Debug, Clone)]
pub struct ValidationError {
    /// The kind of validation error
    pub kind: ValidationErrorKind,
    /// The field that failed validation
    pub field: String,
    /// Optional additional context
    pub context: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(kind: ValidationErrorKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            context: None,
        }
    }

    /// Shorthand for a missing required field on a named entity
    pub fn required(entity: &str, field: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::RequiredField, field).add_context(entity.to_string())
    }

    /// Add context to an existing error
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(
                f,
                "Validation failed for field '{}': {} - {}",
                self.field, self.kind, ctx
            ),
            None => write!(
                f,
                "Validation failed for field '{}': {}",
                self.field, self.kind
            ),
        }
    }
}

/// Specific validation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Field is required but missing or blank
    #[error("Required field is missing")]
    RequiredField,

    /// The CDC image needed by the operation is absent
    #[error("Change image is missing")]
    MissingImage,

    /// Field value is malformed
    #[error("Invalid value")]
    InvalidValue,

    /// Custom validation error
    #[error("{0}")]
    Custom(String),
}

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Convert validation errors to application errors
impl From<ValidationError> for crate::error::Error {
    fn from(err: ValidationError) -> Self {
        crate::error::Error::validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for crate::error::Error {
    fn from(err: validator::ValidationErrors) -> Self {
        crate::error::Error::validation(err.to_string())
    }
}
