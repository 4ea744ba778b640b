//! Security audit logging for authentication events
//!
//! Every event is logged at INFO with the `audit` target so it can be
//! routed apart from application logs. Events carry account ids and
//! emails, never passwords or tokens.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Client details taken from request headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    SignupSuccess {
        account_id: i64,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    SignupFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    LoginSuccess {
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Refresh token exchanged, or rejected when `failure_reason` is set
    TokenRefresh {
        success: bool,
        failure_reason: Option<String>,
        ip_address: Option<String>,
    },

    Logout {
        account_id: i64,
        email: String,
        ip_address: Option<String>,
    },

    EmailConfirmed {
        already_confirmed: bool,
        ip_address: Option<String>,
    },

    PasswordReset {
        account_id: i64,
        email: String,
        ip_address: Option<String>,
    },

    /// Invalid, expired or orphaned access token presented
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },
}

impl AuditEvent {
    /// Short human-readable message for the log line
    pub fn summary(&self) -> &'static str {
        match self {
            AuditEvent::SignupSuccess { .. } => "Signup successful",
            AuditEvent::SignupFailure { .. } => "Signup failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::TokenRefresh { success: true, .. } => "Token refresh",
            AuditEvent::TokenRefresh { .. } => "Token refresh rejected",
            AuditEvent::Logout { .. } => "Logout",
            AuditEvent::EmailConfirmed { .. } => "Email confirmed",
            AuditEvent::PasswordReset { .. } => "Password reset",
            AuditEvent::InvalidToken { .. } => "Invalid token",
        }
    }

    fn ip_address(&self) -> Option<&str> {
        match self {
            AuditEvent::SignupSuccess { ip_address, .. }
            | AuditEvent::SignupFailure { ip_address, .. }
            | AuditEvent::LoginSuccess { ip_address, .. }
            | AuditEvent::LoginFailure { ip_address, .. }
            | AuditEvent::TokenRefresh { ip_address, .. }
            | AuditEvent::Logout { ip_address, .. }
            | AuditEvent::EmailConfirmed { ip_address, .. }
            | AuditEvent::PasswordReset { ip_address, .. }
            | AuditEvent::InvalidToken { ip_address, .. } => ip_address.as_deref(),
        }
    }
}

/// Log a security audit event with structured fields
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        event = %event_json,
        ip_address = ?event.ip_address(),
        "{}",
        event.summary()
    );
}

/// Extract the client IP from proxy headers
///
/// Takes the first entry of X-Forwarded-For, then X-Real-IP.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|xff| xff.to_str().ok())
        .and_then(|xff| xff.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|ip| ip.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
