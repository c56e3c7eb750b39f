//! Defines the HTTP routes for contact management.

use super::handlers::{create_contact, delete_contact, get_contact, list_contacts, update_contact};
use crate::auth::middleware::require_verified_user;
use crate::state::AppState;
use axum::{Router, middleware, routing::get};

pub fn contact_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route(
            "/{id}",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route_layer(middleware::from_fn_with_state(state, require_verified_user))
}
