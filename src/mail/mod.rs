//! Outbound mail for the email-verification flow.

mod smtp;
mod templates;

pub use smtp::SmtpMailer;
pub use templates::VerificationEmail;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("invalid mail configuration: {0}")]
    InvalidConfig(String),
}

/// Sends the link a new user follows to activate their account.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, link: &str) -> Result<(), MailError>;
}
