//! # Managerial Tokens
//!
//! Short numeric codes a supervisor issues so a salesperson can perform a
//! restricted action at the point of sale (a discount beyond their limit,
//! a cancellation, a price change, supervisor mode).
//!
//! ## Lifecycle
//! ```text
//!                      redeem (use_count < max_uses)
//!                     ┌──────────┐
//!                     │          ▼
//!   issue ──────► ┌────────┐  use_count == max_uses  ┌──────────┐
//!                 │ Active │ ───────────────────────►│ Consumed │
//!                 └───┬──┬─┘                         └──────────┘
//!          now ≥      │  │ revoke
//!        expires_at   │  └──────────────────────────►┌──────────┐
//!                     ▼                              │ Revoked  │
//!                 ┌─────────┐                        └──────────┘
//!                 │ Expired │
//!                 └─────────┘
//!
//!   Precedence when several apply: Revoked > Expired > Consumed > Active
//! ```
//!
//! The state is never stored; it is derived from the row at a given
//! instant. Storage performs redemption as one conditional update, and
//! uses [`ManagerialToken::check_redeemable`] only to explain a refusal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{TokenRejection, ValidationError};
use crate::types::Percent;
use crate::validation::{validate_rate_bps, ValidationResult};
use crate::TOKEN_CODE_DIGITS;

// =============================================================================
// Scope
// =============================================================================

/// Action a token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    Discount,
    Cancellation,
    PriceChange,
    SupervisorMode,
}

impl TokenScope {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Discount => "discount",
            TokenScope::Cancellation => "cancellation",
            TokenScope::PriceChange => "price_change",
            TokenScope::SupervisorMode => "supervisor_mode",
        }
    }
}

impl std::fmt::Display for TokenScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TokenScope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "discount" => Ok(TokenScope::Discount),
            "cancellation" => Ok(TokenScope::Cancellation),
            "price_change" => Ok(TokenScope::PriceChange),
            "supervisor_mode" => Ok(TokenScope::SupervisorMode),
            _ => Err(ValidationError::InvalidFormat {
                field: "scope".to_string(),
                reason: "expected discount, cancellation, price_change or supervisor_mode".to_string(),
            }),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Active,
    Consumed,
    Expired,
    Revoked,
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStatus::Active => write!(f, "active"),
            TokenStatus::Consumed => write!(f, "consumed"),
            TokenStatus::Expired => write!(f, "expired"),
            TokenStatus::Revoked => write!(f, "revoked"),
        }
    }
}

// =============================================================================
// Token
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ManagerialToken {
    pub id: String,
    pub tenant_id: String,
    pub code: String,
    pub scope: TokenScope,
    /// Largest discount the token allows. Discount scope only.
    pub max_discount_bps: Option<u32>,
    pub issued_by: String,
    pub issued_to: Option<String>,
    pub max_uses: u32,
    pub use_count: u32,
    pub is_active: bool,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ManagerialToken {
    pub fn status_at(&self, now: DateTime<Utc>) -> TokenStatus {
        if !self.is_active || self.revoked_at.is_some() {
            TokenStatus::Revoked
        } else if now >= self.expires_at {
            TokenStatus::Expired
        } else if self.use_count >= self.max_uses {
            TokenStatus::Consumed
        } else {
            TokenStatus::Active
        }
    }

    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.use_count)
    }

    pub fn max_discount(&self) -> Option<Percent> {
        self.max_discount_bps.map(Percent::from_bps)
    }

    /// Checks whether the token may be used for `scope` at `now`.
    ///
    /// A requested discount is only compared against the cap when the
    /// token has one.
    pub fn check_redeemable(
        &self,
        scope: TokenScope,
        requested_discount: Option<Percent>,
        now: DateTime<Utc>,
    ) -> Result<(), TokenRejection> {
        match self.status_at(now) {
            TokenStatus::Revoked => return Err(TokenRejection::Revoked),
            TokenStatus::Expired => return Err(TokenRejection::Expired),
            TokenStatus::Consumed => return Err(TokenRejection::Exhausted),
            TokenStatus::Active => {}
        }

        if self.scope != scope {
            return Err(TokenRejection::ScopeMismatch);
        }

        if let (Some(requested), Some(cap)) = (requested_discount, self.max_discount()) {
            if requested > cap {
                return Err(TokenRejection::DiscountTooLarge);
            }
        }

        Ok(())
    }
}

// =============================================================================
// Issuance
// =============================================================================

/// Request to issue a token.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewToken {
    pub scope: TokenScope,
    pub max_discount_bps: Option<u32>,
    pub issued_by: String,
    pub issued_to: Option<String>,
    pub max_uses: u32,
    pub ttl_minutes: i64,
}

impl NewToken {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.issued_by.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "issued_by".to_string(),
            });
        }

        if self.max_uses == 0 {
            return Err(ValidationError::MustBePositive {
                field: "max_uses".to_string(),
            });
        }

        if self.ttl_minutes <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "ttl_minutes".to_string(),
            });
        }

        if let Some(bps) = self.max_discount_bps {
            if self.scope != TokenScope::Discount {
                return Err(ValidationError::InvalidFormat {
                    field: "max_discount".to_string(),
                    reason: "only discount tokens carry a discount cap".to_string(),
                });
            }
            validate_rate_bps("max_discount", bps)?;
        }

        Ok(())
    }

    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(self.ttl_minutes)
    }
}

/// Draws a fresh zero-padded code from a v4 UUID.
///
/// Codes are only unique per tenant by storage constraint; callers retry
/// on collision.
pub fn generate_code() -> String {
    let modulus = 10u128.pow(TOKEN_CODE_DIGITS as u32);
    format!(
        "{:0width$}",
        Uuid::new_v4().as_u128() % modulus,
        width = TOKEN_CODE_DIGITS
    )
}

// =============================================================================
// Redemption
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub code: String,
    pub scope: TokenScope,
    pub redeemed_by: String,
    /// Sale or order the use applies to.
    pub reference: Option<String>,
    pub requested_discount_bps: Option<u32>,
}

impl RedeemRequest {
    pub fn requested_discount(&self) -> Option<Percent> {
        self.requested_discount_bps.map(Percent::from_bps)
    }
}

/// One accepted use of a token.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TokenRedemption {
    pub id: String,
    pub token_id: String,
    pub redeemed_by: String,
    pub reference: Option<String>,
    pub discount_bps: Option<u32>,
    #[ts(as = "String")]
    pub redeemed_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn token(max_uses: u32, use_count: u32, expires_in_minutes: i64) -> ManagerialToken {
        let now = Utc::now();
        ManagerialToken {
            id: "t1".to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            code: "123456".to_string(),
            scope: TokenScope::Discount,
            max_discount_bps: Some(1500),
            issued_by: "gerente".to_string(),
            issued_to: None,
            max_uses,
            use_count,
            is_active: true,
            expires_at: now + Duration::minutes(expires_in_minutes),
            created_at: now,
            revoked_at: None,
        }
    }

    #[test]
    fn test_status_precedence() {
        let now = Utc::now();

        assert_eq!(token(1, 0, 30).status_at(now), TokenStatus::Active);
        assert_eq!(token(1, 1, 30).status_at(now), TokenStatus::Consumed);
        assert_eq!(token(1, 1, -1).status_at(now), TokenStatus::Expired);

        let mut revoked = token(1, 1, -1);
        revoked.is_active = false;
        revoked.revoked_at = Some(now);
        assert_eq!(revoked.status_at(now), TokenStatus::Revoked);
    }

    #[test]
    fn test_expired_rejected_under_cap() {
        let t = token(5, 0, -1);
        assert_eq!(
            t.check_redeemable(TokenScope::Discount, None, Utc::now()),
            Err(TokenRejection::Expired)
        );
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let t = token(1, 0, 10);
        assert_eq!(t.status_at(t.expires_at), TokenStatus::Expired);
        assert_eq!(t.status_at(t.expires_at - Duration::seconds(1)), TokenStatus::Active);
    }

    #[test]
    fn test_scope_and_discount_checks() {
        let now = Utc::now();
        let t = token(1, 0, 30);

        assert_eq!(
            t.check_redeemable(TokenScope::Cancellation, None, now),
            Err(TokenRejection::ScopeMismatch)
        );
        assert_eq!(
            t.check_redeemable(TokenScope::Discount, Some(Percent::from_bps(2000)), now),
            Err(TokenRejection::DiscountTooLarge)
        );
        assert!(t
            .check_redeemable(TokenScope::Discount, Some(Percent::from_bps(1500)), now)
            .is_ok());
        assert!(t.check_redeemable(TokenScope::Discount, None, now).is_ok());
    }

    #[test]
    fn test_new_token_validation() {
        let valid = NewToken {
            scope: TokenScope::Discount,
            max_discount_bps: Some(2000),
            issued_by: "gerente".to_string(),
            issued_to: Some("vendedor".to_string()),
            max_uses: 1,
            ttl_minutes: 30,
        };
        assert!(valid.validate().is_ok());

        let mut t = valid.clone();
        t.max_uses = 0;
        assert!(t.validate().is_err());

        let mut t = valid.clone();
        t.ttl_minutes = 0;
        assert!(t.validate().is_err());

        let mut t = valid.clone();
        t.max_discount_bps = Some(10001);
        assert!(t.validate().is_err());

        let mut t = valid;
        t.scope = TokenScope::Cancellation;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_generate_code_format() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), TOKEN_CODE_DIGITS);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("price-change".parse::<TokenScope>().unwrap(), TokenScope::PriceChange);
        assert_eq!("Discount".parse::<TokenScope>().unwrap(), TokenScope::Discount);
        assert!("refund".parse::<TokenScope>().is_err());
        assert_eq!(TokenScope::SupervisorMode.to_string(), "supervisor_mode");
    }
}
