//! Database error classification
//!
//! Wraps sqlx errors so callers can distinguish the unique-violation
//! race (expected during concurrent order confirmation) from genuine
//! failures, and so transient errors can be marked retryable.

use crate::error::{AppError, AppErrorKind, InfrastructureError};
use thiserror::Error;

/// Postgres error code for unique constraint violations.
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("row not found")]
    NotFound,

    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("query failed: {message}")]
    Query { message: String },
}

impl DatabaseError {
    /// Classify a raw sqlx error.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) {
                    return DatabaseError::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    };
                }
                DatabaseError::Query {
                    message: db_err.message().to_string(),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Connection {
                    message: err.to_string(),
                }
            }
            _ => DatabaseError::Query {
                message: err.to_string(),
            },
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::Connection { .. })
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: err.to_string(),
            is_retryable,
        }))
    }
}
