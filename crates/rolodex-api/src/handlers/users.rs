//! Account profile handlers

use crate::auth::{AvatarRequest, CurrentAccount};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Extension, Json};
use rolodex_core::AccountPublic;
use std::sync::Arc;

/// Get the current account
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current account", body = AccountPublic),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Json<AccountPublic> {
    Json(account.to_public())
}

/// Set the current account's avatar URL
#[utoipa::path(
    patch,
    path = "/api/users/avatar",
    tag = "users",
    request_body = AvatarRequest,
    responses(
        (status = 200, description = "Avatar updated", body = AccountPublic),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 422, description = "Invalid URL", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_avatar_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(request): Json<AvatarRequest>,
) -> Result<Json<AccountPublic>, AppError> {
    let updated = state.auth.update_avatar(&account, request).await?;
    Ok(Json(updated))
}
