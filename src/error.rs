//! Errors raised by the ledger and the HTTP layer around it.
//!
//! - [`Validation`] split shares or request fields that cannot be accepted.
//! - [`Reconciliation`] supplied shares that do not add up to the expense.
//! - [`NotFound`] a referenced member, group or expense is missing.
//!
//! None of them is fatal: every failure is scoped to the single request that
//! caused it and nothing is persisted when one is returned.
//!
//!  [`Validation`]: LedgerError::Validation
//!  [`Reconciliation`]: LedgerError::Reconciliation
//!  [`NotFound`]: LedgerError::NotFound
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::money::Money;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Shares add up to {actual}, expected {expected}")]
    Reconciliation { expected: Money, actual: Money },
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Concurrent update on {0}, retry the request")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (
                Self::Reconciliation {
                    expected: e1,
                    actual: a1,
                },
                Self::Reconciliation {
                    expected: e2,
                    actual: a2,
                },
            ) => e1 == e2 && a1 == a2,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Reconciliation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ExistingKey(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        HttpResponse::build(status).json(json!({ "error": self.to_string() }))
    }
}
