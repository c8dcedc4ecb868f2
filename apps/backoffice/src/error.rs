//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command Function                                                       │
//! │  Result<T, ApiError>                                                    │
//! │         │                                                               │
//! │         ├── DbError::QueryFailed("...")    ──► DATABASE_ERROR (logged)  │
//! │         ├── DbError::TokenRejected(Expired)──► TOKEN_REJECTED           │
//! │         ├── ValidationError::Required      ──► VALIDATION_ERROR         │
//! │         └── CoreError::InvalidSale         ──► BUSINESS_LOGIC           │
//! │                                                                         │
//! │  Screens show `message` in a toast and branch on `code`.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal details (SQL messages, file paths) are logged with
//! `tracing::error!` and never put in `message`.

use serde::Serialize;
use ipe_core::{CoreError, TokenRejection, ValidationError};
use ipe_db::DbError;

/// Error returned from commands.
///
/// ```json
/// { "code": "TOKEN_REJECTED", "message": "token has expired" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,

    /// Input validation failed
    ValidationError,

    /// A unique field (SKU, CPF, token code) is taken
    Conflict,

    /// A managerial token was refused
    TokenRejected,

    /// Business rule violated
    BusinessLogic,

    DatabaseError,

    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn token(reason: TokenRejection) -> Self {
        ApiError::new(ErrorCode::TokenRejected, reason.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::TokenRejected(reason) => ApiError::token(reason),
            DbError::Validation(e) => ApiError::from(e),
            DbError::Domain(e) => ApiError::from(e),
            DbError::NotProvisioned(e) => {
                tracing::error!("Storage not provisioned: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Feature not available yet")
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored document unreadable: {}", e);
                ApiError::internal("Stored data could not be read")
            }
            DbError::LocalStorage(e) => {
                tracing::error!("Local storage failed: {}", e);
                ApiError::internal("Local settings could not be saved")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", &id),
            CoreError::InvalidSale { reason } => {
                ApiError::new(ErrorCode::BusinessLogic, format!("Invalid sale: {}", reason))
            }
            CoreError::TokenIssuance { reason } => {
                ApiError::new(ErrorCode::BusinessLogic, format!("Could not issue token: {}", reason))
            }
            CoreError::TokenRejected(reason) => ApiError::token(reason),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_rejection_maps_to_code() {
        let err = ApiError::from(DbError::TokenRejected(TokenRejection::Expired));
        assert_eq!(err.code, ErrorCode::TokenRejected);
        assert_eq!(err.message, "token has expired");
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELEC"));
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::from(DbError::duplicate("sku", "SOF-001"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CONFLICT");
        assert_eq!(json["message"], "sku 'SOF-001' already exists");
    }
}
