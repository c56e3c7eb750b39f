//! Handler functions for contact management API endpoints.

use super::models::{ContactQuery, CreateContactRequest, UpdateContactRequest};
use crate::api::common::{ApiResponse, PaginatedData, PaginationMeta};
use crate::api::extract::{AppJson, AppPath, AppQuery};
use crate::auth::middleware::CurrentUser;
use crate::database::models::Contact;
use crate::errors::ServiceError;
use crate::services::contact_service::ContactService;
use crate::state::AppState;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json as ResponseJson,
};

pub async fn create_contact(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateContactRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Contact>>), ServiceError> {
    let contact = ContactService::new(&state.pool)
        .create_contact(&user, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(contact, "Contact created successfully")),
    ))
}

/// Lists the caller's contacts with pagination and optional search.
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppQuery(query): AppQuery<ContactQuery>,
) -> Result<ResponseJson<ApiResponse<PaginatedData<Contact>>>, ServiceError> {
    let (contacts, total) = ContactService::new(&state.pool)
        .list_contacts(&user, &query)
        .await?;

    let pagination = PaginationMeta::from_filter(&query.pagination(), total);
    Ok(ResponseJson(ApiResponse::paginated(
        PaginatedData::new(contacts, total),
        pagination,
        "Contacts retrieved successfully",
    )))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppPath(id): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<Contact>>, ServiceError> {
    let contact = ContactService::new(&state.pool)
        .get_contact_required(&user, &id)
        .await?;

    Ok(ResponseJson(ApiResponse::success(
        contact,
        "Contact retrieved successfully",
    )))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppPath(id): AppPath<String>,
    AppJson(payload): AppJson<UpdateContactRequest>,
) -> Result<ResponseJson<ApiResponse<Contact>>, ServiceError> {
    let contact = ContactService::new(&state.pool)
        .update_contact(&user, &id, payload)
        .await?;

    Ok(ResponseJson(ApiResponse::success(
        contact,
        "Contact updated successfully",
    )))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode, ServiceError> {
    ContactService::new(&state.pool)
        .delete_contact(&user, &id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
