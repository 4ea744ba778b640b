//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rolodex_core::RolodexError;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized {
        code: &'static str,
        message: String,
    },
    Conflict {
        code: &'static str,
        message: String,
    },
    Validation {
        field: String,
        message: String,
    },
    Internal(String),
    Database(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::NotFound(resource) => ApiError::not_found(&resource),
            AppError::Unauthorized { code, message } => ApiError::new(code, message),
            AppError::Conflict { code, message } => ApiError::new(code, message),
            AppError::Validation { field, message } => {
                ApiError::new("VALIDATION_ERROR", format!("Invalid value for {field}"))
                    .with_details(format!("{field}: {message}"))
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                ApiError::internal_error()
            }
            AppError::Database(msg) => {
                error!(error = %msg, "Database error");
                ApiError::new("DATABASE_ERROR", "Database operation failed")
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<RolodexError> for AppError {
    fn from(err: RolodexError) -> Self {
        let message = err.to_string();
        match err {
            RolodexError::EmailAlreadyRegistered => AppError::Conflict {
                code: "EMAIL_ALREADY_REGISTERED",
                message,
            },
            RolodexError::DuplicateContactEmail => AppError::Conflict {
                code: "DUPLICATE_CONTACT_EMAIL",
                message,
            },
            RolodexError::InvalidCredentials => AppError::Unauthorized {
                code: "INVALID_CREDENTIALS",
                message,
            },
            RolodexError::EmailNotConfirmed => AppError::Unauthorized {
                code: "EMAIL_NOT_CONFIRMED",
                message,
            },
            RolodexError::TokenExpired => AppError::Unauthorized {
                code: "TOKEN_EXPIRED",
                message,
            },
            RolodexError::TokenMalformed => AppError::Unauthorized {
                code: "TOKEN_MALFORMED",
                message,
            },
            RolodexError::TokenKindMismatch { .. } => AppError::Unauthorized {
                code: "TOKEN_KIND_MISMATCH",
                message,
            },
            RolodexError::RefreshTokenRevoked => AppError::Unauthorized {
                code: "REFRESH_TOKEN_REVOKED",
                message,
            },
            RolodexError::Unauthenticated => AppError::Unauthorized {
                code: "UNAUTHORIZED",
                message,
            },
            RolodexError::ValidationError { field, message } => {
                AppError::Validation { field, message }
            }
            RolodexError::AccountNotFound => AppError::NotFound("Account".to_string()),
            RolodexError::DatabaseError(msg) => AppError::Database(msg),
            RolodexError::ConfigError(msg) => {
                AppError::Internal(format!("Configuration error: {msg}"))
            }
            RolodexError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}
