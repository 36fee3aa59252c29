//! Out-of-band delivery of reset tokens.

use async_trait::async_trait;

/// Delivery failure reported by a [`Notifier`].
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Sends reset tokens to their owners.
///
/// Failures are reported back but never fail the operation that generated
/// the token; the caller logs them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_reset_token(&self, email: &str, token: &str) -> Result<(), NotifyError>;
}

/// Notifier that only writes to the log. The token itself is logged at
/// `debug` so it can be picked up in development.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_reset_token(&self, email: &str, token: &str) -> Result<(), NotifyError> {
        log::info!("Password reset token issued for {}", email);
        log::debug!("Reset token for {}: {}", email, token);
        Ok(())
    }
}
