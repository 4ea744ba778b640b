//! Authentication API handlers
//!
//! Thin wrappers over [`AuthGateway`](crate::auth::AuthGateway) that add
//! audit logging and HTTP status codes.

use crate::audit::{audit_log, AuditEvent, RequestContext};
use crate::auth::middleware::{require_bearer, CurrentAccount};
use crate::auth::{
    EmailConfirmation, EmailRequest, LoginRequest, ResetPasswordRequest, SignupRequest, TokenPair,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use rolodex_core::AccountPublic;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Plain confirmation message
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Register a new account
///
/// The account starts unconfirmed; a verification email is sent.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AccountPublic),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
        (status = 422, description = "Invalid input", body = crate::error::ApiError),
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    let email = request.email.clone();

    match state.auth.signup(request).await {
        Ok(account) => {
            audit_log(&AuditEvent::SignupSuccess {
                account_id: account.id,
                email: account.email.clone(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Ok((StatusCode::CREATED, Json(account)))
        }
        Err(e) => {
            audit_log(&AuditEvent::SignupFailure {
                email,
                reason: e.to_string(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Err(e.into())
        }
    }
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Invalid credentials or email not confirmed", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    let email = request.email.clone();

    match state.auth.login(request).await {
        Ok(pair) => {
            audit_log(&AuditEvent::LoginSuccess {
                email,
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Ok(Json(pair))
        }
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                email,
                reason: e.to_string(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Err(e.into())
        }
    }
}

/// Exchange a refresh token for a new pair
///
/// The refresh token goes in `Authorization: Bearer`. The presented token
/// is revoked by the rotation.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "Tokens rotated", body = TokenPair),
        (status = 401, description = "Invalid, expired or revoked refresh token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenPair>, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    let result = match require_bearer(&headers) {
        Ok(token) => state.auth.refresh(token).await,
        Err(e) => Err(e),
    };

    audit_log(&AuditEvent::TokenRefresh {
        success: result.is_ok(),
        failure_reason: result.as_ref().err().map(|e| e.to_string()),
        ip_address: ctx.ip_address,
    });

    Ok(Json(result?))
}

/// Revoke the current account's refresh token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    state.auth.logout(&account).await?;

    audit_log(&AuditEvent::Logout {
        account_id: account.id,
        email: account.email,
        ip_address: RequestContext::from_headers(&headers).ip_address,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Confirm an email address from the emailed link
#[utoipa::path(
    get,
    path = "/api/auth/confirmed_email/{token}",
    tag = "auth",
    params(("token" = String, Path, description = "Email verification token")),
    responses(
        (status = 200, description = "Email confirmed", body = MessageResponse),
        (status = 401, description = "Invalid or expired token", body = crate::error::ApiError),
        (status = 404, description = "Account not found", body = crate::error::ApiError),
    )
)]
pub async fn confirmed_email_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    let outcome = state.auth.confirm_email(&token).await?;

    audit_log(&AuditEvent::EmailConfirmed {
        already_confirmed: outcome == EmailConfirmation::AlreadyConfirmed,
        ip_address: RequestContext::from_headers(&headers).ip_address,
    });

    let message = match outcome {
        EmailConfirmation::Confirmed => "Email confirmed",
        EmailConfirmation::AlreadyConfirmed => "Your email is already confirmed",
    };
    Ok(Json(MessageResponse::new(message)))
}

/// Re-send the verification email
///
/// Responds the same whether or not the address is registered.
#[utoipa::path(
    post,
    path = "/api/auth/request_email",
    tag = "auth",
    request_body = EmailRequest,
    responses((status = 200, description = "Request accepted", body = MessageResponse))
)]
pub async fn request_email_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.request_verification_email(&request.email).await?;
    Ok(Json(MessageResponse::new("Check your email for confirmation")))
}

/// Start a password reset
///
/// Responds the same whether or not the address is registered.
#[utoipa::path(
    post,
    path = "/api/auth/request_password_reset",
    tag = "auth",
    request_body = EmailRequest,
    responses((status = 200, description = "Request accepted", body = MessageResponse))
)]
pub async fn request_password_reset_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.request_password_reset(&request.email).await?;
    Ok(Json(MessageResponse::new(
        "Check your email for password reset instructions",
    )))
}

/// Complete a password reset
#[utoipa::path(
    post,
    path = "/api/auth/reset_password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Invalid or expired token", body = crate::error::ApiError),
        (status = 422, description = "Invalid password", body = crate::error::ApiError),
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let account = state.auth.reset_password(request).await?;

    audit_log(&AuditEvent::PasswordReset {
        account_id: account.id,
        email: account.email,
        ip_address: RequestContext::from_headers(&headers).ip_address,
    });

    Ok(Json(MessageResponse::new("Password has been reset")))
}
