//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when an input is malformed.
//! - [`BudgetExceeded`] thrown when a valid transaction would overshoot its
//!   budget; the transaction is not stored.
//! - [`DeadlineExceeded`] and [`Cancelled`] thrown when a report context
//!   expires before the aggregation completes.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`BudgetExceeded`]: EngineError::BudgetExceeded
//!  [`DeadlineExceeded`]: EngineError::DeadlineExceeded
//!  [`Cancelled`]: EngineError::Cancelled
use sea_orm::DbErr;
use thiserror::Error;

use crate::Money;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("budget exceeded: limit {limit}, would be {new_total} ({percentage:.1}%)")]
    BudgetExceeded {
        limit: Money,
        new_total: Money,
        percentage: f64,
    },
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("operation cancelled")]
    Cancelled,
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (
                Self::BudgetExceeded {
                    limit: l1,
                    new_total: t1,
                    percentage: p1,
                },
                Self::BudgetExceeded {
                    limit: l2,
                    new_total: t2,
                    percentage: p2,
                },
            ) => l1 == l2 && t1 == t2 && (p1 - p2).abs() < f64::EPSILON,
            (Self::DeadlineExceeded, Self::DeadlineExceeded) => true,
            (Self::Cancelled, Self::Cancelled) => true,
            (Self::Configuration(a), Self::Configuration(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
