//! Rolodex Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout Rolodex:
//! - Account and contact models
//! - Contact field validation and the upcoming-birthday window
//! - Common error types
//! - Storage traits with PostgreSQL and in-memory backends
//! - The outbound notification trait
//! - Configuration management

pub mod birthday;
pub mod config;
pub mod models;
pub mod notify;
pub mod store;
pub mod validation;

pub use birthday::BirthdayWindow;
pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, MailConfig};
pub use models::{
    Account, AccountPublic, Contact, ContactFields, ContactSearch, CreateContact, NewAccount,
    UpdateContact,
};
pub use notify::Mailer;
pub use store::{AccountStore, ContactStore, MemoryStore, PgStore};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Rolodex operations
///
/// Every core operation returns either a success value or one of these.
/// None of them carry password hashes, refresh digests or signing secrets.
#[derive(Error, Debug)]
pub enum RolodexError {
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Malformed token")]
    TokenMalformed,

    #[error("Token kind mismatch: expected {expected}, got {actual}")]
    TokenKindMismatch { expected: String, actual: String },

    #[error("Refresh token has been revoked")]
    RefreshTokenRevoked,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Validation failed on {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("A contact with this email already exists")]
    DuplicateContactEmail,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RolodexError {
    /// Build a validation error for a single offending field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RolodexError>;
