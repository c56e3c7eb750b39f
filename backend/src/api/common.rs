//! Response envelope and error mapping shared by all endpoints.
//!
//! Provides structured responses and the conversion from service-layer errors
//! into HTTP responses:
//! - Standard `ApiResponse` format
//! - ServiceError to HTTP status code mapping
//! - Pagination support for list endpoints
//!
//! # Response Format
//! All errors return consistent JSON responses containing:
//! - `message`: Human-readable message
//! - `error.error_type`: Machine-readable error category
//! - `error.details`: Optional field-specific validation errors
//!
//! # Error Handling Flow
//! 1. Service layer returns domain-specific `ServiceError`
//! 2. `service_error_to_http` converts it to a response
//! 3. Internal failures are logged and replaced with a generic message

use crate::errors::{AuthFailure, ServiceError};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

pub use crate::errors::FieldError;

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    /// Pagination metadata (present for paginated responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
    /// Request timestamp
    pub timestamp: String,
}

/// Pagination metadata for list responses
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub current_page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Total number of items across all pages
    pub total_items: u64,
    /// Total number of pages
    pub total_pages: u32,
    /// Whether there is a next page
    pub has_next: bool,
    /// Whether there is a previous page
    pub has_prev: bool,
    /// Next page number (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
    /// Previous page number (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<u32>,
}

/// Paginated response wrapper containing items and pagination metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedData<T> {
    /// List of items for current page
    pub items: Vec<T>,
    /// Total count of items
    pub total: u64,
}

/// Error details for failed requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error type identifier
    pub error_type: String,
    /// Field-specific validation errors when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Pagination parameters for requests
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationFilter {
    /// Page number (1-indexed)
    pub page: Option<u32>,
    /// Number of items per page
    pub per_page: Option<u32>,
}

impl PaginationMeta {
    /// Create pagination metadata from page parameters and total count
    pub fn new(current_page: u32, per_page: u32, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            ((total_items - 1) / per_page as u64 + 1) as u32
        };

        let has_next = current_page < total_pages;
        let has_prev = current_page > 1;

        Self {
            current_page,
            per_page,
            total_items,
            total_pages,
            has_next,
            has_prev,
            next_page: has_next.then(|| current_page + 1),
            prev_page: has_prev.then(|| current_page - 1),
        }
    }

    pub fn from_filter(filter: &PaginationFilter, total_items: u64) -> Self {
        Self::new(filter.page(), filter.per_page(), total_items)
    }
}

impl<T> PaginatedData<T> {
    /// Create a new paginated data wrapper
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            pagination: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a successful paginated response
    pub fn paginated(data: T, pagination: PaginationMeta, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            pagination: Some(pagination),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an error response
    pub fn error(
        message: impl Into<String>,
        error_type: impl Into<String>,
        details: Option<Vec<FieldError>>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: message.into(),
            error: Some(ErrorDetails {
                error_type: error_type.into(),
                details,
            }),
            pagination: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl PaginationFilter {
    /// Get page number with default
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get per_page with default
    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    /// Calculate offset for database queries
    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.per_page() as u64
    }

    /// Get limit for database queries
    pub fn limit(&self) -> u64 {
        self.per_page() as u64
    }
}

impl Default for PaginationFilter {
    fn default() -> Self {
        Self {
            page: Some(1),
            per_page: Some(20),
        }
    }
}

/// Converts ServiceError to the HTTP response in the standard format
pub fn service_error_to_http(error: ServiceError) -> Response {
    let mut details = None;
    let mut extra_header = None;

    let (status, error_type, message) = match error {
        ServiceError::Validation { message, fields } => {
            if !fields.is_empty() {
                details = Some(fields);
            }
            (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
        }
        ServiceError::NotFound { entity, .. } => (
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{entity} not found"),
        ),
        ServiceError::AlreadyExists { entity, .. } => (
            StatusCode::CONFLICT,
            "already_exists",
            format!("{entity} already exists"),
        ),
        ServiceError::Unauthenticated(failure) => {
            extra_header = Some((header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer")));
            let message = match failure {
                AuthFailure::MissingCredential => "Not authenticated",
                AuthFailure::InvalidCredential => "Could not validate credentials",
            };
            (StatusCode::UNAUTHORIZED, "unauthenticated", message.to_string())
        }
        ServiceError::PermissionDenied { message } => {
            (StatusCode::FORBIDDEN, "permission_denied", message)
        }
        ServiceError::AlreadyVerified => (
            StatusCode::BAD_REQUEST,
            "already_verified",
            "Email already verified".to_string(),
        ),
        ServiceError::InvalidVerificationToken => (
            StatusCode::BAD_REQUEST,
            "invalid_token",
            "Invalid or expired verification token".to_string(),
        ),
        ServiceError::TooManyRequests {
            retry_after_seconds,
        } => {
            extra_header = HeaderValue::from_str(&retry_after_seconds.to_string())
                .ok()
                .map(|value| (header::RETRY_AFTER, value));
            (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests".to_string(),
            )
        }
        ServiceError::Database { source } => {
            tracing::error!("Database error: {:#}", source);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                "Internal server error".to_string(),
            )
        }
        ServiceError::Unavailable { message } => {
            tracing::warn!("External service unavailable: {}", message);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "A required external service is unavailable".to_string(),
            )
        }
        ServiceError::InternalError { message } => {
            tracing::error!("Internal error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            )
        }
    };

    let body = ApiResponse::<()>::error(message, error_type, details);
    let mut response = (status, Json(body)).into_response();
    if let Some((name, value)) = extra_header {
        response.headers_mut().insert(name, value);
    }
    response
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        service_error_to_http(self)
    }
}
