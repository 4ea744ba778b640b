//! Authentication and authorization module
//!
//! - Token issuance and validation (HS256 JWT, one kind per purpose)
//! - Password hashing with Argon2id
//! - The auth gateway owning every account mutation
//! - Middleware resolving bearer tokens to accounts
//! - Mailer implementations

pub mod mailer;
pub mod middleware;
pub mod password;
pub mod service;
pub mod tokens;

pub use mailer::LogMailer;
pub use middleware::{auth_middleware, bearer_token, resolve, CurrentAccount};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::{
    AuthGateway, AvatarRequest, EmailConfirmation, EmailRequest, LoginRequest,
    ResetPasswordRequest, SignupRequest, TokenPair,
};
pub use tokens::{Claims, TokenError, TokenKind, TokenService};
