//! Middleware for protecting authenticated routes.
//!
//! Every protected request passes through the identity gate: the bearer token
//! is extracted and verified, its subject resolved to a stored user, and
//! optionally the user's email verification is enforced. The resolved user is
//! handed to handlers as a `CurrentUser` extension.

use crate::database::models::User;
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserRepository;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

/// The authenticated caller of a protected route.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Reads the bearer credential from the `Authorization` header.
///
/// A missing header or a non-bearer scheme counts as no credential at all.
pub fn bearer_token(headers: &HeaderMap) -> ServiceResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(ServiceError::missing_credential)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(ServiceError::missing_credential)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ServiceError::missing_credential());
    }

    Ok(token.trim())
}

/// Resolves the caller of a request.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    require_verified: bool,
) -> ServiceResult<User> {
    let token = bearer_token(headers)?;
    let subject = state.tokens.verify(token)?;

    // A valid token whose account no longer exists is just another bad credential.
    let user = UserRepository::new(&state.pool)
        .get_user_by_email(&subject)
        .await?
        .ok_or_else(ServiceError::invalid_credential)?;

    if !user.is_active {
        return Err(ServiceError::permission_denied("Inactive user"));
    }

    if require_verified && !user.is_verified {
        return Err(ServiceError::permission_denied("Email not verified"));
    }

    Ok(user)
}

/// Requires a valid bearer token for an account with a verified email.
pub async fn require_verified_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = authenticate(&state, request.headers(), true).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
