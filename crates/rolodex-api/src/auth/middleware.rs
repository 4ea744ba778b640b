//! Authentication middleware for protecting routes
//!
//! Resolves the `Authorization: Bearer` access token to a stored account.
//! On success the account is added to request extensions as
//! [`CurrentAccount`].

use super::tokens::TokenKind;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use rolodex_core::{Account, Result, RolodexError};
use std::sync::Arc;

/// Account resolved from the request's access token
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve an access token to its account
///
/// Every failure collapses to `Unauthenticated`; the reason is returned
/// alongside for logging only.
pub async fn resolve(
    state: &AppState,
    token: &str,
) -> std::result::Result<Account, (RolodexError, String)> {
    let unauthenticated = |reason: String| (RolodexError::Unauthenticated, reason);

    let claims = state
        .auth
        .tokens()
        .decode(token, TokenKind::Access, state.clock.now())
        .map_err(|e| unauthenticated(e.to_string()))?;

    match state.accounts.find_by_email(&claims.sub).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err(unauthenticated("Account no longer exists".to_string())),
        Err(e) => Err((e, "Account lookup failed".to_string())),
    }
}

/// Authentication middleware that requires a valid access token
///
/// Wire it with `middleware::from_fn_with_state(state, auth_middleware)`
/// and read the account in handlers with `Extension<CurrentAccount>`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> std::result::Result<Response, AppError> {
    let Some(token) = bearer_token(request.headers()) else {
        return Err(RolodexError::Unauthenticated.into());
    };

    let account = match resolve(&state, token).await {
        Ok(account) => account,
        Err((err, reason)) => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
                reason,
            });
            return Err(err.into());
        }
    };

    request.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(request).await)
}

/// Require a bearer token in handlers outside the protected router
pub fn require_bearer(headers: &HeaderMap) -> Result<&str> {
    bearer_token(headers).ok_or(RolodexError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::testing::memory_state;
    use axum::http::HeaderValue;
    use chrono::{Duration, NaiveDate};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_resolve_rejects_unknown_subject() {
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 6, 8).unwrap());
        let (state, _) = memory_state(clock);
        let token = state
            .auth
            .tokens()
            .mint(TokenKind::Access, "ghost@example.com", clock.now())
            .unwrap();

        let (err, reason) = resolve(&state, &token).await.unwrap_err();
        assert!(matches!(err, RolodexError::Unauthenticated));
        assert!(reason.contains("no longer exists"));
    }

    #[tokio::test]
    async fn test_resolve_rejects_refresh_and_expired_tokens() {
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 6, 8).unwrap());
        let (state, _) = memory_state(clock);
        let tokens = state.auth.tokens();

        let refresh = tokens
            .mint(TokenKind::Refresh, "a@example.com", clock.now())
            .unwrap();
        let (err, _) = resolve(&state, &refresh).await.unwrap_err();
        assert!(matches!(err, RolodexError::Unauthenticated));

        let stale = tokens
            .issue(
                TokenKind::Access,
                "a@example.com",
                Duration::minutes(15),
                clock.now() - Duration::hours(1),
            )
            .unwrap();
        let (err, reason) = resolve(&state, &stale).await.unwrap_err();
        assert!(matches!(err, RolodexError::Unauthenticated));
        assert!(reason.contains("expired"));
    }
}
