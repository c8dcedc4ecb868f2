//! # Error Types
//!
//! Domain-specific error types for ipe-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ipe-core errors (this file)                                           │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── TokenRejection   - Why a managerial token cannot be used          │
//! │                                                                         │
//! │  ipe-db errors (separate crate)                                        │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  apps/backoffice                                                       │
//! │  └── ApiError         - What the screens see (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Notification │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A sale cannot be recorded with an empty item list or a total that does
    /// not match its items.
    #[error("Invalid sale: {reason}")]
    InvalidSale { reason: String },

    /// Token code could not be issued (e.g. every generated code collided).
    #[error("Could not issue token: {reason}")]
    TokenIssuance { reason: String },

    #[error("Token rejected: {0}")]
    TokenRejected(#[from] TokenRejection),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Check digits of a CPF/CNPJ do not match.
    #[error("{field} has invalid check digits")]
    InvalidCheckDigits { field: String },
}

// =============================================================================
// Token Rejection
// =============================================================================

/// Reasons a managerial token cannot be redeemed.
///
/// ## Evaluation Order
/// ```text
/// not found ─► revoked ─► expired ─► exhausted ─► wrong scope ─► discount cap
/// ```
/// The first failing check wins, so an expired token that is also at its
/// cap reports `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TokenRejection {
    #[error("token not found")]
    NotFound,

    #[error("token was revoked")]
    Revoked,

    #[error("token has expired")]
    Expired,

    #[error("token has no uses left")]
    Exhausted,

    #[error("token does not authorize this action")]
    ScopeMismatch,

    #[error("requested discount exceeds the token limit")]
    DiscountTooLarge,
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
