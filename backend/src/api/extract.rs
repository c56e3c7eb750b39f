//! Request extractors that reject with the standard error envelope.
//!
//! axum's stock `Json`, `Query` and `Path` answer malformed input with a plain
//! text body quoting the deserializer. These wrappers turn every rejection into
//! a `ServiceError::Validation` with a fixed message; the raw rejection text is
//! only logged.

use crate::errors::ServiceError;
use axum::extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct AppJson<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct AppQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServiceError))]
pub struct AppPath<T>(pub T);

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {}", rejection.body_text());

        match rejection {
            JsonRejection::JsonDataError(_) => {
                ServiceError::validation("Request body has missing or invalid fields")
            }
            JsonRejection::JsonSyntaxError(_) => {
                ServiceError::validation("Request body is not valid JSON")
            }
            JsonRejection::MissingJsonContentType(_) => {
                ServiceError::validation("Expected a request with Content-Type: application/json")
            }
            JsonRejection::BytesRejection(rejection) => rejection.into(),
            _ => ServiceError::validation("Invalid request body"),
        }
    }
}

impl From<BytesRejection> for ServiceError {
    fn from(rejection: BytesRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());

        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServiceError::validation("Request body is too large")
        } else {
            ServiceError::validation("Invalid request body")
        }
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("Rejected query string: {}", rejection.body_text());
        ServiceError::validation("Invalid query parameters")
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path parameters: {}", rejection.body_text());
        ServiceError::validation("Invalid path parameters")
    }
}
