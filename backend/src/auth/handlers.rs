//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse request data and hand it to `AuthService`; protected
//! handlers receive the caller from the identity gate as `CurrentUser`.

use crate::api::extract::{AppJson, AppQuery};
use crate::auth::middleware::CurrentUser;
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::errors::ServiceError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::Json as ResponseJson,
};

/// Handle user registration
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<UserResponse>), ServiceError> {
    let user = AuthService::new(&state).register(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(user.into())))
}

/// Handle user login request
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<ResponseJson<TokenResponse>, ServiceError> {
    let response = AuthService::new(&state).login(payload).await?;
    Ok(ResponseJson(response))
}

/// Handle the link from a verification email
pub async fn verify_email(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<VerifyEmailQuery>,
) -> Result<ResponseJson<MessageResponse>, ServiceError> {
    AuthService::new(&state).verify_email(&query.token).await?;
    Ok(ResponseJson(MessageResponse::new("Email verified successfully")))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    AppJson(payload): AppJson<EmailRequest>,
) -> Result<ResponseJson<MessageResponse>, ServiceError> {
    AuthService::new(&state).resend_verification(payload).await?;
    Ok(ResponseJson(MessageResponse::new("Verification email sent")))
}

/// Get current user info
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> ResponseJson<UserResponse> {
    ResponseJson(user.into())
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<ResponseJson<UserResponse>, ServiceError> {
    let user = AuthService::new(&state).update_profile(user, payload).await?;
    Ok(ResponseJson(user.into()))
}

/// Accepts the raw image as the request body.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<ResponseJson<UserResponse>, ServiceError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServiceError::validation("File is too large (max 5MB)")
        } else {
            rejection.into()
        }
    })?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let user = AuthService::new(&state)
        .upload_avatar(user, content_type, body)
        .await?;
    Ok(ResponseJson(user.into()))
}
