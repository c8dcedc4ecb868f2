//! # Managerial Token Commands
//!
//! A manager issues a short numeric code; a salesperson types it at the
//! counter to unlock a discount, a cancellation or a price change.
//!
//! ## Token Lifecycle
//! ```text
//!            issue_token()
//!                 │
//!                 ▼
//!   ┌──────────────────────────┐   redeem_token() × max_uses   ┌──────────┐
//!   │          ACTIVE          │ ─────────────────────────────►│ CONSUMED │
//!   └──────────────────────────┘                               └──────────┘
//!        │                  │
//!        │ now ≥ expires_at │ revoke_token()
//!        ▼                  ▼
//!   ┌─────────┐        ┌─────────┐
//!   │ EXPIRED │        │ REVOKED │
//!   └─────────┘        └─────────┘
//! ```
//!
//! Redemption is decided by a single conditional update in storage, so two
//! counters typing the same single-use code cannot both succeed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::{AppConfig, DbState};
use ipe_core::token::{ManagerialToken, NewToken, RedeemRequest, TokenRedemption, TokenScope, TokenStatus};
use ipe_core::Percent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub code: String,
    pub scope: TokenScope,
    pub status: TokenStatus,
    pub max_discount_bps: Option<u32>,
    pub issued_by: String,
    pub issued_to: Option<String>,
    pub max_uses: u32,
    pub remaining_uses: u32,
    pub expires_at: String,
}

impl TokenDto {
    fn at(token: &ManagerialToken, now: DateTime<Utc>) -> Self {
        TokenDto {
            code: token.code.clone(),
            scope: token.scope,
            status: token.status_at(now),
            max_discount_bps: token.max_discount_bps,
            issued_by: token.issued_by.clone(),
            issued_to: token.issued_to.clone(),
            max_uses: token.max_uses,
            remaining_uses: token.remaining_uses(),
            expires_at: token.expires_at.to_rfc3339(),
        }
    }
}

/// Issue form. Unset fields take the configured token defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenInput {
    pub scope: TokenScope,
    pub issued_by: String,
    pub issued_to: Option<String>,
    /// Discount cap as a percentage ("10" → 10%).
    pub max_discount_pct: Option<f64>,
    pub max_uses: Option<u32>,
    pub ttl_minutes: Option<i64>,
}

pub async fn issue_token(
    db: &DbState,
    config: &AppConfig,
    input: IssueTokenInput,
) -> Result<TokenDto, ApiError> {
    let max_discount_bps = match input.max_discount_pct {
        Some(pct) if !pct.is_finite() || pct < 0.0 => {
            return Err(ApiError::validation("max_discount must be a non-negative number"))
        }
        Some(pct) => Some(Percent::from_percentage(pct).bps()),
        None => None,
    };

    let new = NewToken {
        scope: input.scope,
        max_discount_bps,
        issued_by: input.issued_by,
        issued_to: input.issued_to,
        max_uses: input.max_uses.unwrap_or(config.tokens.max_uses),
        ttl_minutes: input.ttl_minutes.unwrap_or(config.tokens.ttl_minutes),
    };

    let now = Utc::now();
    let token = db.inner().tokens().issue(&new, now).await?;
    info!(scope = %token.scope, expires_at = %token.expires_at, "Token issued");
    Ok(TokenDto::at(&token, now))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemTokenInput {
    pub code: String,
    pub scope: TokenScope,
    pub redeemed_by: String,
    pub reference: Option<String>,
    pub discount_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionDto {
    pub token: TokenDto,
    pub redemption: TokenRedemption,
}

/// Consumes one use of a token. Rejections come back as `TOKEN_REJECTED`
/// with the reason in the message.
pub async fn redeem_token(db: &DbState, input: RedeemTokenInput) -> Result<RedemptionDto, ApiError> {
    if input.redeemed_by.trim().is_empty() {
        return Err(ApiError::validation("redeemed_by is required"));
    }

    let request = RedeemRequest {
        code: input.code,
        scope: input.scope,
        redeemed_by: input.redeemed_by,
        reference: input.reference,
        requested_discount_bps: input
            .discount_pct
            .map(|pct| Percent::from_percentage(pct).bps()),
    };

    let now = Utc::now();
    let (token, redemption) = db.inner().tokens().redeem(&request, now).await?;
    Ok(RedemptionDto {
        token: TokenDto::at(&token, now),
        redemption,
    })
}

pub async fn revoke_token(db: &DbState, code: &str) -> Result<TokenDto, ApiError> {
    let now = Utc::now();
    let token = db.inner().tokens().revoke(code, now).await?;
    Ok(TokenDto::at(&token, now))
}

pub async fn list_active_tokens(db: &DbState) -> Result<Vec<TokenDto>, ApiError> {
    let now = Utc::now();
    let tokens = db.inner().tokens().list_active(now).await?;
    Ok(tokens.iter().map(|t| TokenDto::at(t, now)).collect())
}

/// Audit trail of one token.
pub async fn token_redemptions(db: &DbState, code: &str) -> Result<Vec<TokenRedemption>, ApiError> {
    let tokens = db.inner().tokens();
    let token = tokens
        .get_by_code(code)
        .await?
        .ok_or_else(|| ApiError::not_found("Token", code.trim()))?;
    Ok(tokens.redemptions(&token.id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::error::ErrorCode;

    fn issue_input(scope: TokenScope) -> IssueTokenInput {
        IssueTokenInput {
            scope,
            issued_by: "gerente-carla".to_string(),
            issued_to: None,
            max_discount_pct: None,
            max_uses: None,
            ttl_minutes: None,
        }
    }

    fn redeem_input(code: &str, scope: TokenScope) -> RedeemTokenInput {
        RedeemTokenInput {
            code: code.to_string(),
            scope,
            redeemed_by: "vendedor-diego".to_string(),
            reference: Some("pedido-42".to_string()),
            discount_pct: None,
        }
    }

    #[tokio::test]
    async fn test_issue_uses_config_defaults() {
        let (db, config) = context().await;
        let token = issue_token(&db, &config, issue_input(TokenScope::Cancellation))
            .await
            .unwrap();
        assert_eq!(token.code.len(), 6);
        assert_eq!(token.max_uses, 1);
        assert_eq!(token.status, TokenStatus::Active);
        assert_eq!(list_active_tokens(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_single_use_token_redeems_once() {
        let (db, config) = context().await;
        let token = issue_token(&db, &config, issue_input(TokenScope::Cancellation))
            .await
            .unwrap();

        let first = redeem_token(&db, redeem_input(&token.code, TokenScope::Cancellation))
            .await
            .unwrap();
        assert_eq!(first.token.status, TokenStatus::Consumed);
        assert_eq!(first.token.remaining_uses, 0);

        let err = redeem_token(&db, redeem_input(&token.code, TokenScope::Cancellation))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenRejected);
        assert!(list_active_tokens(&db).await.unwrap().is_empty());

        let trail = token_redemptions(&db, &token.code).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].reference.as_deref(), Some("pedido-42"));
    }

    #[tokio::test]
    async fn test_discount_cap_and_scope() {
        let (db, config) = context().await;
        let mut input = issue_input(TokenScope::Discount);
        input.max_discount_pct = Some(10.0);
        input.max_uses = Some(3);
        let token = issue_token(&db, &config, input).await.unwrap();
        assert_eq!(token.max_discount_bps, Some(1000));

        let mut too_much = redeem_input(&token.code, TokenScope::Discount);
        too_much.discount_pct = Some(15.0);
        let err = redeem_token(&db, too_much).await.unwrap_err();
        assert_eq!(err.message, ipe_core::TokenRejection::DiscountTooLarge.to_string());

        let err = redeem_token(&db, redeem_input(&token.code, TokenScope::PriceChange))
            .await
            .unwrap_err();
        assert_eq!(err.message, ipe_core::TokenRejection::ScopeMismatch.to_string());

        let mut ok = redeem_input(&token.code, TokenScope::Discount);
        ok.discount_pct = Some(10.0);
        let redeemed = redeem_token(&db, ok).await.unwrap();
        assert_eq!(redeemed.token.remaining_uses, 2);
        assert_eq!(redeemed.redemption.discount_bps, Some(1000));
    }

    #[tokio::test]
    async fn test_revoked_token_rejected() {
        let (db, config) = context().await;
        let token = issue_token(&db, &config, issue_input(TokenScope::SupervisorMode))
            .await
            .unwrap();
        let revoked = revoke_token(&db, &token.code).await.unwrap();
        assert_eq!(revoked.status, TokenStatus::Revoked);

        let err = redeem_token(&db, redeem_input(&token.code, TokenScope::SupervisorMode))
            .await
            .unwrap_err();
        assert_eq!(err.message, ipe_core::TokenRejection::Revoked.to_string());
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let (db, config) = context().await;
        let mut input = issue_input(TokenScope::Discount);
        input.max_discount_pct = Some(-5.0);
        assert_eq!(
            issue_token(&db, &config, input).await.unwrap_err().code,
            ErrorCode::ValidationError
        );

        let mut input = issue_input(TokenScope::Cancellation);
        input.max_discount_pct = Some(5.0);
        assert_eq!(
            issue_token(&db, &config, input).await.unwrap_err().code,
            ErrorCode::ValidationError
        );

        let mut blank = redeem_input("123456", TokenScope::Discount);
        blank.redeemed_by = " ".to_string();
        assert!(redeem_token(&db, blank).await.is_err());

        let err = redeem_token(&db, redeem_input("abc", TokenScope::Discount))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenRejected);

        assert_eq!(revoke_token(&db, "999999").await.unwrap_err().code, ErrorCode::NotFound);
    }
}
