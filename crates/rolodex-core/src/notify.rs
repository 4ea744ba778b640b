//! Outbound notification collaborator
//!
//! Delivery itself (SMTP, templates) lives outside this workspace. Callers
//! treat sends as fire-and-forget: failures are logged, never surfaced to
//! the user whose request triggered them.

use async_trait::async_trait;

use crate::Result;

/// Trait for outbound account emails
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the address-confirmation message carrying a verification token
    async fn send_verification_email(
        &self,
        address: &str,
        display_name: &str,
        token: &str,
    ) -> Result<()>;

    /// Send the password-reset message carrying a reset token
    async fn send_password_reset_email(
        &self,
        address: &str,
        display_name: &str,
        token: &str,
    ) -> Result<()>;

    /// Mailer name for logging
    fn name(&self) -> &str;
}
