//! Defines the HTTP routes for authentication and the caller's own profile.

use crate::api::throttle::throttle;
use crate::auth::handlers::*;
use crate::auth::middleware::require_verified_user;
use crate::services::avatar_service::MAX_AVATAR_BYTES;
use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use std::convert::Infallible;

/// Creates the authentication router with all auth-related routes
pub fn auth_router(state: AppState) -> Router<AppState> {
    let verified = middleware::from_fn_with_state(state.clone(), require_verified_user);
    let throttled = middleware::from_fn_with_state(state, throttle);

    // The throttle wraps the gate so limited requests are rejected first.
    let me_routes = get(me)
        .layer::<_, Infallible>(verified.clone())
        .layer::<_, Infallible>(throttled)
        .merge(put(update_me).layer::<_, Infallible>(verified.clone()));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-email", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/me", me_routes)
        .route(
            "/me/avatar",
            post(upload_avatar)
                .layer::<_, Infallible>(verified)
                .layer::<_, Infallible>(DefaultBodyLimit::max(MAX_AVATAR_BYTES)),
        )
}
