//! Contact handlers
//!
//! Every handler goes through [`OwnedContacts`] built from the account the
//! middleware resolved; a contact owned by someone else looks missing.

use crate::auth::CurrentAccount;
use crate::contacts::OwnedContacts;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use rolodex_core::{Account, Contact, ContactSearch, CreateContact, UpdateContact};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

/// Pagination parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListParams {
    /// Contacts to skip (default 0)
    pub skip: Option<i64>,
    /// Page size, clamped to 1..=100 (default 100)
    pub limit: Option<i64>,
}

fn owned<'a>(state: &'a AppState, account: &Account) -> OwnedContacts<'a> {
    OwnedContacts::new(state.contacts.as_ref(), account, state.clock.today())
}

fn not_found() -> AppError {
    AppError::NotFound("Contact".to_string())
}

/// List the current account's contacts
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "contacts",
    params(ListParams),
    responses(
        (status = 200, description = "Contacts in insertion order", body = Vec<Contact>),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = owned(&state, &account)
        .list(params.skip, params.limit)
        .await?;
    Ok(Json(contacts))
}

/// Get one contact
#[utoipa::path(
    get,
    path = "/api/contacts/{id}",
    tag = "contacts",
    params(("id" = i64, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact", body = Contact),
        (status = 404, description = "Contact not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
) -> Result<Json<Contact>, AppError> {
    let contact = owned(&state, &account).get(id).await?.ok_or_else(not_found)?;
    Ok(Json(contact))
}

/// Create a contact
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "contacts",
    request_body = CreateContact,
    responses(
        (status = 201, description = "Contact created", body = Contact),
        (status = 409, description = "Email already used by a contact", body = crate::error::ApiError),
        (status = 422, description = "Invalid field", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(request): Json<CreateContact>,
) -> Result<impl IntoResponse, AppError> {
    let contact = owned(&state, &account).create(&request).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// Replace a contact's fields
#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    tag = "contacts",
    params(("id" = i64, Path, description = "Contact ID")),
    request_body = UpdateContact,
    responses(
        (status = 200, description = "Contact updated", body = Contact),
        (status = 404, description = "Contact not found", body = crate::error::ApiError),
        (status = 409, description = "Email already used by a contact", body = crate::error::ApiError),
        (status = 422, description = "Invalid field", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateContact>,
) -> Result<Json<Contact>, AppError> {
    let contact = owned(&state, &account)
        .update(id, &request)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(contact))
}

/// Delete a contact, returning it
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "contacts",
    params(("id" = i64, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Deleted contact", body = Contact),
        (status = 404, description = "Contact not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
) -> Result<Json<Contact>, AppError> {
    let contact = owned(&state, &account)
        .delete(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(contact))
}

/// Search contacts
///
/// Text filters are case-insensitive substrings and must all match.
/// `upcoming_birthdays=true` keeps birthdays in the next seven days.
#[utoipa::path(
    get,
    path = "/api/contacts/filter/search",
    tag = "contacts",
    params(
        ("name" = Option<String>, Query, description = "Substring of the first name"),
        ("surname" = Option<String>, Query, description = "Substring of the last name"),
        ("email" = Option<String>, Query, description = "Substring of the email"),
        ("upcoming_birthdays" = Option<bool>, Query, description = "Only birthdays within a week"),
    ),
    responses(
        (status = 200, description = "Matching contacts", body = Vec<Contact>),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_contacts(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Query(search): Query<ContactSearch>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = owned(&state, &account).search(search).await?;
    Ok(Json(contacts))
}
