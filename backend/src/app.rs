//! Router assembly: every route, middleware layer and shared state in one place.

use crate::api::common::ApiResponse;
use crate::api::contact::routes::contact_router;
use crate::auth::routes::auth_router;
use crate::config::Config;
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    response::Json,
    routing::get,
};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api/v1/auth", auth_router(state.clone()))
        .nest("/api/v1/contacts", contact_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Builds the CORS policy from `ALLOWED_ORIGINS`; `*` allows any origin.
fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

async fn root_handler() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(
        json!({
            "service": "Contacts API",
            "version": env!("CARGO_PKG_VERSION"),
        }),
        "Welcome to the Contacts API",
    ))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
