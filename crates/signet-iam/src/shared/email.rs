//! Email Sender Seam
//!
//! Outbound mail is an external collaborator; the core only needs password
//! reset delivery. The SMTP-backed implementation lives with the transport
//! deployment; `LoggingEmailSender` backs dev wiring and tests.

use async_trait::async_trait;
use tracing::info;

use crate::shared::error::Result;

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a password-reset mail. Fire-and-forget from the core's
    /// perspective: failures are the implementation's problem to retry or
    /// drop, and must never leak the token into logs.
    async fn send_password_reset_mail(
        &self,
        to_address: &str,
        reset_token: &str,
        locale: &str,
    ) -> Result<()>;
}

/// Dev implementation that records the delivery without the token.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send_password_reset_mail(
        &self,
        to_address: &str,
        _reset_token: &str,
        locale: &str,
    ) -> Result<()> {
        info!(to = %to_address, locale = %locale, "password reset mail dispatched");
        Ok(())
    }
}
