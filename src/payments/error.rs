use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Provider did not respond within {seconds}s")]
    TimeoutError { seconds: u64 },

    #[error("Webhook signature verification failed: {message}")]
    SignatureError { message: String },

    #[error("Provider error: {message}")]
    ProviderError {
        message: String,
        provider_code: Option<String>,
        retryable: bool,
    },
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::ValidationError { .. } => false,
            PaymentError::NetworkError { .. } => true,
            PaymentError::TimeoutError { .. } => true,
            PaymentError::SignatureError { .. } => false,
            PaymentError::ProviderError { retryable, .. } => *retryable,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::ValidationError { .. } => 400,
            PaymentError::NetworkError { .. } => 500,
            PaymentError::TimeoutError { .. } => 504,
            PaymentError::SignatureError { .. } => 400,
            PaymentError::ProviderError { .. } => 500,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PaymentError::ValidationError { message, .. } => message.clone(),
            PaymentError::NetworkError { .. } => {
                "Payment provider is temporarily unavailable".to_string()
            }
            PaymentError::TimeoutError { .. } => {
                "The payment provider did not respond in time. Please try again.".to_string()
            }
            PaymentError::SignatureError { .. } => "Invalid webhook signature".to_string(),
            PaymentError::ProviderError { message, .. } => {
                format!("Failed to create payment intent: {}", message)
            }
        }
    }
}

impl From<PaymentError> for crate::error::AppError {
    fn from(err: PaymentError) -> Self {
        use crate::error::{AppError, AppErrorKind, ExternalError, ValidationError};

        let kind = match &err {
            PaymentError::ValidationError { message, field } => {
                AppErrorKind::Validation(ValidationError::Invalid {
                    field: field.clone().unwrap_or_else(|| "request".to_string()),
                    reason: message.clone(),
                })
            }
            PaymentError::TimeoutError { seconds } => AppErrorKind::External(ExternalError::Timeout {
                service: "Stripe".to_string(),
                timeout_secs: *seconds,
            }),
            PaymentError::SignatureError { message } => {
                AppErrorKind::External(ExternalError::SignatureInvalid {
                    reason: message.clone(),
                })
            }
            other => AppErrorKind::External(ExternalError::PaymentProvider {
                message: other.to_string(),
                is_retryable: other.is_retryable(),
            }),
        };

        AppError::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_http_status_mapping_is_correct() {
        assert_eq!(
            PaymentError::ValidationError {
                message: "bad".to_string(),
                field: None
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            PaymentError::TimeoutError { seconds: 25 }.http_status_code(),
            504
        );
        assert_eq!(
            PaymentError::ProviderError {
                message: "card error".to_string(),
                provider_code: None,
                retryable: false
            }
            .http_status_code(),
            500
        );
    }

    #[test]
    fn retryable_flags_are_set() {
        assert!(PaymentError::NetworkError {
            message: "connection reset".to_string()
        }
        .is_retryable());
        assert!(PaymentError::TimeoutError { seconds: 25 }.is_retryable());
        assert!(!PaymentError::SignatureError {
            message: "digest mismatch".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn timeout_converts_to_gateway_timeout_app_error() {
        let app_error: crate::error::AppError = PaymentError::TimeoutError { seconds: 25 }.into();
        assert_eq!(app_error.status_code(), 504);
    }
}
