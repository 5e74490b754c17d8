pub mod resend;
pub mod templates;

use async_trait::async_trait;
use thiserror::Error;

pub type EmailResult<T> = Result<T, EmailError>;

#[derive(Debug, Clone, Error)]
pub enum EmailError {
    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Provider error: {message}")]
    ProviderError { message: String },
}

impl From<EmailError> for crate::error::AppError {
    fn from(err: EmailError) -> Self {
        use crate::error::{AppError, AppErrorKind, ExternalError};

        AppError::new(AppErrorKind::External(ExternalError::EmailProvider {
            message: err.to_string(),
        }))
    }
}

/// Outbound email. reply_to is set by the contact form so the admin can
/// answer the visitor directly.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
}

/// Email delivery abstraction, implemented by the Resend client in
/// production and by a recording double in tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a message, returning the provider's message id if available.
    async fn send(&self, message: EmailMessage) -> EmailResult<Option<String>>;
}
