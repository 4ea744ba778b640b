//! Signed token issuance and validation
//!
//! All tokens are HS256 JWTs signed with the deployment secret. A `kind`
//! claim separates access, refresh, email-verification and password-reset
//! tokens so one can never stand in for another.
//!
//! Expiry is checked against a caller-supplied `now` instead of the system
//! clock, which keeps issue/decode pure and lets tests pin time.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rolodex_core::{AuthConfig, ConfigError, RolodexError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Purpose a token was minted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::EmailVerification => "email_verification",
            TokenKind::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - account email
    pub sub: String,
    /// Unique token id; two tokens minted in the same second still differ
    pub jti: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    pub kind: TokenKind,
    /// Fingerprint of the credential the token is bound to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred: Option<String>,
}

/// Token issuance and validation errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token lifetime out of range")]
    LifetimeOutOfRange,

    #[error("Malformed token")]
    Malformed,

    #[error("Token has expired")]
    Expired,

    #[error("Expected a {expected} token, got {actual}")]
    KindMismatch {
        expected: TokenKind,
        actual: TokenKind,
    },
}

impl From<TokenError> for RolodexError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::EncodingError(e) => {
                RolodexError::Other(anyhow::anyhow!("failed to sign token: {e}"))
            }
            TokenError::LifetimeOutOfRange => {
                RolodexError::Other(anyhow::anyhow!("token lifetime out of range"))
            }
            TokenError::Malformed => RolodexError::TokenMalformed,
            TokenError::Expired => RolodexError::TokenExpired,
            TokenError::KindMismatch { expected, actual } => RolodexError::TokenKindMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
        }
    }
}

/// Issues and decodes tokens with one shared secret
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    email_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    /// Build the service; lifetimes chrono cannot represent are rejected
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_ttl: lifetime(
                "JWT_ACCESS_TTL_MINS",
                config.access_ttl_mins,
                Duration::try_minutes,
            )?,
            refresh_ttl: lifetime(
                "JWT_REFRESH_TTL_DAYS",
                config.refresh_ttl_days,
                Duration::try_days,
            )?,
            email_ttl: lifetime(
                "JWT_EMAIL_TTL_HOURS",
                config.email_ttl_hours,
                Duration::try_hours,
            )?,
            reset_ttl: lifetime(
                "JWT_RESET_TTL_MINS",
                config.reset_ttl_mins,
                Duration::try_minutes,
            )?,
        })
    }

    /// Configured lifetime for a token kind
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::EmailVerification => self.email_ttl,
            TokenKind::PasswordReset => self.reset_ttl,
        }
    }

    /// Sign a token for `subject` valid from `now` for `ttl`
    pub fn issue(
        &self,
        kind: TokenKind,
        subject: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(kind, subject, ttl, now, None)
    }

    /// Sign a token using the configured lifetime for its kind
    pub fn mint(
        &self,
        kind: TokenKind,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(kind, subject, self.ttl(kind), now, None)
    }

    /// Like [`mint`](Self::mint), carrying a credential fingerprint in `cred`
    pub fn mint_bound(
        &self,
        kind: TokenKind,
        subject: &str,
        credential: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(kind, subject, self.ttl(kind), now, Some(credential.to_string()))
    }

    fn sign(
        &self,
        kind: TokenKind,
        subject: &str,
        ttl: Duration,
        now: DateTime<Utc>,
        cred: Option<String>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat,
            exp: iat
                .checked_add(ttl.num_seconds())
                .ok_or(TokenError::LifetimeOutOfRange)?,
            kind,
            cred,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Verify a token and return its claims
    ///
    /// Checks run in order: signature and issuer, expiry (`now >= exp`
    /// is expired), then the kind tag.
    pub fn decode(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["iss", "sub", "exp"]);
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::Malformed)?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        if claims.kind != expected {
            return Err(TokenError::KindMismatch {
                expected,
                actual: claims.kind,
            });
        }

        Ok(claims)
    }
}

fn lifetime(
    key: &str,
    value: u64,
    build: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    i64::try_from(value)
        .ok()
        .and_then(build)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}
