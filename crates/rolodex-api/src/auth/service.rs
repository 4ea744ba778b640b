//! Authentication service layer
//!
//! `AuthGateway` is the only component that mutates account state:
//! signup, login, token refresh and revocation, email confirmation,
//! password reset and avatar updates.

use super::password::{
    hash_password_with_config, validate_password_length, verify_password, PasswordConfig,
};
use super::tokens::{TokenKind, TokenService};
use crate::clock::Clock;
use chrono::{DateTime, Utc};
use rolodex_core::validation::first_field_error;
use rolodex_core::{
    Account, AccountPublic, AccountStore, AppConfig, Mailer, NewAccount, Result, RolodexError,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Account registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 2, max = 50, message = "must be 2-50 characters"))]
    pub display_name: String,

    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

/// Request carrying only an email address
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

/// Password reset completion
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Avatar update request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AvatarRequest {
    #[validate(url(message = "must be a valid URL"))]
    pub avatar: String,
}

/// Access and refresh token pair
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "bearer"
    pub token_type: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

/// Outcome of an email confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailConfirmation {
    Confirmed,
    AlreadyConfirmed,
}

/// Authentication gateway
pub struct AuthGateway {
    accounts: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    tokens: TokenService,
    passwords: PasswordConfig,
    /// Hash verified against when the login email is unknown
    dummy_hash: String,
    mail_timeout: Duration,
}

impl AuthGateway {
    /// Create a new gateway
    ///
    /// Fails if the password cost parameters or token lifetimes are invalid.
    pub fn new(
        config: &AppConfig,
        accounts: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        passwords: PasswordConfig,
    ) -> Result<Self> {
        let dummy_hash = hash_password_with_config("rolodex-dummy-password", &passwords)?;

        Ok(Self {
            accounts,
            mailer,
            clock,
            tokens: TokenService::new(&config.auth)?,
            passwords,
            dummy_hash,
            mail_timeout: Duration::from_secs(config.mail.timeout_secs),
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register a new, unconfirmed account and send its verification email
    ///
    /// A mail failure or timeout is logged; the account is still created.
    pub async fn signup(&self, request: SignupRequest) -> Result<AccountPublic> {
        request.validate().map_err(first_field_error)?;
        validate_password_length("password", &request.password)?;

        let email = request.email.trim().to_string();
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(RolodexError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password_with_config(&request.password, &self.passwords)?;
        let account = self
            .accounts
            .create_account(NewAccount {
                display_name: request.display_name.trim().to_string(),
                email,
                password_hash,
            })
            .await?;

        info!(account_id = account.id, "Account created");
        self.send_verification(&account).await;

        Ok(account.to_public())
    }

    /// Exchange credentials for a token pair
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair> {
        let Some(account) = self.accounts.find_by_email(&request.email).await? else {
            // Equalize timing with the known-account path
            let _ = verify_password(&request.password, &self.dummy_hash);
            return Err(RolodexError::InvalidCredentials);
        };

        match verify_password(&request.password, &account.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(RolodexError::InvalidCredentials),
            Err(e) => {
                warn!(account_id = account.id, error = %e, "Stored password hash is unusable");
                return Err(RolodexError::InvalidCredentials);
            }
        }

        if !account.confirmed {
            return Err(RolodexError::EmailNotConfirmed);
        }

        self.issue_pair(&account).await
    }

    /// Rotate a refresh token into a new pair
    ///
    /// The presented token must be the one most recently issued to the
    /// account; anything else has been superseded or revoked.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self
            .tokens
            .decode(refresh_token, TokenKind::Refresh, self.clock.now())?;

        let account = self
            .accounts
            .find_by_email(&claims.sub)
            .await?
            .ok_or(RolodexError::RefreshTokenRevoked)?;

        let presented = digest(refresh_token);
        if account.refresh_token.as_deref() != Some(presented.as_str()) {
            return Err(RolodexError::RefreshTokenRevoked);
        }

        self.issue_pair(&account).await
    }

    /// Revoke every outstanding refresh token for the account
    pub async fn logout(&self, account: &Account) -> Result<()> {
        self.accounts.set_refresh_token(account.id, None).await?;
        debug!(account_id = account.id, "Refresh token cleared");
        Ok(())
    }

    /// Mark the token's subject as confirmed; repeat calls are no-ops
    pub async fn confirm_email(&self, token: &str) -> Result<EmailConfirmation> {
        let claims = self
            .tokens
            .decode(token, TokenKind::EmailVerification, self.clock.now())?;

        let account = self
            .accounts
            .find_by_email(&claims.sub)
            .await?
            .ok_or(RolodexError::AccountNotFound)?;

        if account.confirmed {
            return Ok(EmailConfirmation::AlreadyConfirmed);
        }

        self.accounts.mark_confirmed(account.id).await?;
        Ok(EmailConfirmation::Confirmed)
    }

    /// Re-send the verification email to an unconfirmed account
    ///
    /// Succeeds whether or not the address is registered.
    pub async fn request_verification_email(&self, email: &str) -> Result<()> {
        match self.accounts.find_by_email(email).await? {
            Some(account) if !account.confirmed => self.send_verification(&account).await,
            Some(_) => debug!("Verification requested for confirmed account"),
            None => debug!("Verification requested for unknown address"),
        }
        Ok(())
    }

    /// Send a password reset token to a registered address
    ///
    /// Succeeds whether or not the address is registered.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let Some(account) = self.accounts.find_by_email(email).await? else {
            debug!("Password reset requested for unknown address");
            return Ok(());
        };

        let token = self.tokens.mint_bound(
            TokenKind::PasswordReset,
            &account.email,
            &credential_fingerprint(&account.password_hash),
            self.clock.now(),
        )?;

        self.deliver(
            "password reset",
            account.id,
            self.mailer
                .send_password_reset_email(&account.email, &account.display_name, &token),
        )
        .await;
        Ok(())
    }

    /// Set a new password from a reset token and revoke refresh tokens
    ///
    /// Reset tokens are bound to the password hash current when they were
    /// issued, so each one works at most once.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<Account> {
        let claims = self
            .tokens
            .decode(&request.token, TokenKind::PasswordReset, self.clock.now())?;
        validate_password_length("new_password", &request.new_password)?;

        let account = self
            .accounts
            .find_by_email(&claims.sub)
            .await?
            .ok_or(RolodexError::AccountNotFound)?;

        let current = credential_fingerprint(&account.password_hash);
        if claims.cred.as_deref() != Some(current.as_str()) {
            debug!(account_id = account.id, "Reset token predates the current password");
            return Err(RolodexError::TokenExpired);
        }

        let password_hash = hash_password_with_config(&request.new_password, &self.passwords)?;
        self.accounts
            .set_password_hash(account.id, &password_hash)
            .await?;
        self.accounts.set_refresh_token(account.id, None).await?;

        Ok(account)
    }

    /// Replace the account's avatar URL
    pub async fn update_avatar(
        &self,
        account: &Account,
        request: AvatarRequest,
    ) -> Result<AccountPublic> {
        request.validate().map_err(first_field_error)?;
        let url = request.avatar.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(RolodexError::validation("avatar", "must be an http(s) URL"));
        }

        let updated = self.accounts.set_avatar(account.id, url).await?;
        Ok(updated.to_public())
    }

    async fn issue_pair(&self, account: &Account) -> Result<TokenPair> {
        let now = self.clock.now();
        let access_token = self.tokens.mint(TokenKind::Access, &account.email, now)?;
        let refresh_token = self.tokens.mint(TokenKind::Refresh, &account.email, now)?;

        self.accounts
            .set_refresh_token(account.id, Some(&digest(&refresh_token)))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        })
    }

    async fn send_verification(&self, account: &Account) {
        let token = match self.tokens.mint(
            TokenKind::EmailVerification,
            &account.email,
            self.clock.now(),
        ) {
            Ok(token) => token,
            Err(e) => {
                warn!(account_id = account.id, error = %e, "Failed to sign verification token");
                return;
            }
        };

        self.deliver(
            "verification",
            account.id,
            self.mailer
                .send_verification_email(&account.email, &account.display_name, &token),
        )
        .await;
    }

    /// Await a send within the mail timeout, logging any failure
    async fn deliver<F>(&self, what: &str, account_id: i64, send: F)
    where
        F: Future<Output = Result<()>>,
    {
        match tokio::time::timeout(self.mail_timeout, send).await {
            Ok(Ok(())) => debug!(account_id, mailer = self.mailer.name(), "Sent {what} email"),
            Ok(Err(e)) => warn!(account_id, error = %e, "Failed to send {what} email"),
            Err(_) => warn!(
                account_id,
                timeout_secs = self.mail_timeout.as_secs(),
                "Timed out sending {what} email"
            ),
        }
    }
}

/// SHA-256 hex digest stored in place of the refresh token
pub fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short digest of a password hash, embedded in reset tokens
fn credential_fingerprint(password_hash: &str) -> String {
    let mut fingerprint = digest(password_hash);
    fingerprint.truncate(16);
    fingerprint
}
