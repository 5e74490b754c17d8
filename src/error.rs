//! Comprehensive error handling for the VignetteLab order backend
//!
//! This module provides a unified error system with proper HTTP status mapping,
//! user-friendly messages, and structured error codes for client handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling by API clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx/5xx)
    #[serde(rename = "PAYMENT_NOT_COMPLETED")]
    PaymentNotCompleted,
    #[serde(rename = "ORDER_CREATION_FAILED")]
    OrderCreationFailed,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (4xx/5xx)
    #[serde(rename = "PAYMENT_PROVIDER_ERROR")]
    PaymentProviderError,
    #[serde(rename = "EMAIL_PROVIDER_ERROR")]
    EmailProviderError,
    #[serde(rename = "EXTERNAL_SERVICE_TIMEOUT")]
    ExternalServiceTimeout,
    #[serde(rename = "SIGNATURE_INVALID")]
    SignatureInvalid,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Confirmation requested but the payment intent has not succeeded
    PaymentNotCompleted { status: String },
    /// Order insert failed for a reason other than the expected duplicate-key race.
    /// The customer has already been charged at this point, so the payment intent
    /// id is carried for manual reconciliation.
    OrderCreationFailed {
        payment_intent_id: String,
        reason: String,
    },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    /// Database connection or query failure
    Database { message: String, is_retryable: bool },
    /// Missing or invalid configuration
    Configuration { message: String },
}

/// External service errors (Stripe, Resend)
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// The payments provider returned an error; message passed through
    PaymentProvider { message: String, is_retryable: bool },
    /// The email provider returned an error
    EmailProvider { message: String },
    /// External service did not respond within the bounded wait
    Timeout { service: String, timeout_secs: u64 },
    /// Webhook payload failed cryptographic verification
    SignatureInvalid { reason: String },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Required field missing from the request body
    MissingField { field: String },
    /// Email does not match the local@domain.tld pattern
    InvalidEmail { email: String },
    /// Image count outside the product line's inclusive bound
    ImageCountOutOfRange {
        count: usize,
        min: usize,
        max: usize,
    },
    /// Price is not numeric or not greater than zero
    InvalidPrice { value: String, reason: String },
    /// Field present but malformed
    Invalid { field: String, reason: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn validation(err: ValidationError) -> Self {
        Self::new(AppErrorKind::Validation(err))
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::validation(ValidationError::MissingField {
            field: field.into(),
        })
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::PaymentNotCompleted { .. } => 400,
                DomainError::OrderCreationFailed { .. } => 500,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => 500,
                InfrastructureError::Configuration { .. } => 500,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => 500,
                ExternalError::EmailProvider { .. } => 500,
                ExternalError::Timeout { .. } => 504,
                ExternalError::SignatureInvalid { .. } => 400,
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::PaymentNotCompleted { .. } => ErrorCode::PaymentNotCompleted,
                DomainError::OrderCreationFailed { .. } => ErrorCode::OrderCreationFailed,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => ErrorCode::PaymentProviderError,
                ExternalError::EmailProvider { .. } => ErrorCode::EmailProviderError,
                ExternalError::Timeout { .. } => ErrorCode::ExternalServiceTimeout,
                ExternalError::SignatureInvalid { .. } => ErrorCode::SignatureInvalid,
            },
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::PaymentNotCompleted { status } => {
                    format!("Payment not completed. Status: {}", status)
                }
                DomainError::OrderCreationFailed { reason, .. } => {
                    format!("Failed to create order: {}", reason)
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { message, .. } => {
                    format!("Failed to create payment intent: {}", message)
                }
                ExternalError::EmailProvider { message } => {
                    format!("Failed to send email: {}", message)
                }
                ExternalError::Timeout { service, .. } => {
                    format!(
                        "The {} service did not respond in time. Please try again.",
                        service
                    )
                }
                ExternalError::SignatureInvalid { .. } => {
                    "Webhook signature verification failed".to_string()
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::MissingField { field } => {
                    format!("Missing required field: {}", field)
                }
                ValidationError::InvalidEmail { email } => {
                    format!("Invalid email address: {}", email)
                }
                ValidationError::ImageCountOutOfRange { min, max, .. } => {
                    format!("Please upload between {} and {} images", min, max)
                }
                ValidationError::InvalidPrice { value, reason } => {
                    format!("Invalid price '{}': {}", value, reason)
                }
                ValidationError::Invalid { field, reason } => {
                    format!("Invalid value for '{}': {}", field, reason)
                }
            },
        }
    }

    /// Check if the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { is_retryable, .. } => *is_retryable,
                ExternalError::EmailProvider { .. } => true,
                ExternalError::Timeout { .. } => true,
                ExternalError::SignatureInvalid { .. } => false,
            },
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: err.to_string(),
            },
        ))
    }
}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
