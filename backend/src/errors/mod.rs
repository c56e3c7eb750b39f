//! Global application error types.
//!
//! Every component reports failures through `ServiceError`. The HTTP layer maps
//! each variant onto one status code and a uniform envelope, so no storage or
//! library detail crosses the external boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a request could not be tied to an identity.
///
/// Both cases are reported as `401`; only the message differs so clients can
/// tell "you sent nothing" from "what you sent is not acceptable". The second
/// case never says whether the token was expired, forged or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingCredential,
    InvalidCredential,
}

/// Field-specific validation error details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field with validation error
    pub field: String,
    /// Description of the validation failure
    pub message: String,
}

/// Generic service error that can be used across all entities
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("{entity} already exists: {identifier}")]
    AlreadyExists { entity: String, identifier: String },

    #[error("Unauthenticated")]
    Unauthenticated(AuthFailure),

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Email already verified")]
    AlreadyVerified,

    #[error("Invalid or expired verification token")]
    InvalidVerificationToken,

    #[error("Too many requests")]
    TooManyRequests { retry_after_seconds: u64 },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("External service unavailable: {message}")]
    Unavailable { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Builds a validation error from `validator` output, keeping per-field detail.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                let field = field.to_string();
                errors.iter().map(move |error| FieldError {
                    field: field.clone(),
                    message: error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));

        Self::invalid_fields(fields)
    }

    /// Builds a validation error from an explicit list of field violations.
    pub fn invalid_fields(fields: Vec<FieldError>) -> Self {
        let message = fields
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join(", ");

        Self::Validation { message, fields }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn missing_credential() -> Self {
        Self::Unauthenticated(AuthFailure::MissingCredential)
    }

    pub fn invalid_credential() -> Self {
        Self::Unauthenticated(AuthFailure::InvalidCredential)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Validates a request payload, turning failures into a field-level `Validation` error.
pub fn validate_request<T: validator::Validate>(payload: &T) -> ServiceResult<()> {
    payload
        .validate()
        .map_err(ServiceError::from_validation_errors)
}

/// Returns true when the error chain bottoms out in a storage uniqueness violation.
pub fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<sqlx::Error>()
        .and_then(|error| error.as_database_error())
        .is_some_and(|db_error| db_error.is_unique_violation())
}
