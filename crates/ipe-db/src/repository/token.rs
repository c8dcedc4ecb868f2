//! # Managerial Token Repository
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  redeem(code, scope, discount)                    one transaction       │
//! │                                                                         │
//! │  UPDATE managerial_tokens SET use_count = use_count + 1                 │
//! │  WHERE code = ? AND active AND not expired AND use_count < max_uses     │
//! │    AND scope = ? AND discount within cap                                │
//! │  RETURNING *                                                            │
//! │       │                                                                 │
//! │       ├── row  ──► INSERT token_redemptions ──► COMMIT ──► Ok           │
//! │       │                                                                 │
//! │       └── none ──► SELECT token ──► check_redeemable() ──► Err(reason)  │
//! │                                                                         │
//! │  The check and the increment are one statement, so two callers racing  │
//! │  for the last use cannot both win.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ipe_core::token::{generate_code, ManagerialToken, NewToken, RedeemRequest, TokenRedemption};
use ipe_core::validation::validate_token_code;
use ipe_core::TokenRejection;

const TOKEN_COLUMNS: &str = r#"
    id, tenant_id, code, scope, max_discount_bps, issued_by, issued_to,
    max_uses, use_count, is_active, expires_at, created_at, revoked_at
"#;

/// Attempts at drawing an unused code before giving up.
const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl TokenRepository {
    pub fn new(pool: SqlitePool, tenant_id: &str) -> Self {
        TokenRepository {
            pool,
            tenant_id: tenant_id.to_string(),
        }
    }

    /// Issues a token with a fresh code, retrying on code collisions.
    pub async fn issue(&self, new: &NewToken, now: DateTime<Utc>) -> DbResult<ManagerialToken> {
        new.validate()?;

        let mut last_code = String::new();
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let token = ManagerialToken {
                id: Uuid::new_v4().to_string(),
                tenant_id: self.tenant_id.clone(),
                code: generate_code(),
                scope: new.scope,
                max_discount_bps: new.max_discount_bps,
                issued_by: new.issued_by.trim().to_string(),
                issued_to: new.issued_to.clone(),
                max_uses: new.max_uses,
                use_count: 0,
                is_active: true,
                expires_at: new.expires_at(now),
                created_at: now,
                revoked_at: None,
            };

            match self.insert(&token).await {
                Ok(()) => {
                    info!(
                        id = %token.id,
                        scope = %token.scope,
                        max_uses = token.max_uses,
                        expires_at = %token.expires_at,
                        "Token issued"
                    );
                    return Ok(token);
                }
                Err(e) if e.is_unique_violation() => {
                    debug!(attempt, "Token code collision, drawing again");
                    last_code = token.code;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts = MAX_CODE_ATTEMPTS, "Could not draw an unused token code");
        Err(DbError::duplicate("token code", last_code))
    }

    async fn insert(&self, token: &ManagerialToken) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO managerial_tokens (
                id, tenant_id, code, scope, max_discount_bps, issued_by, issued_to,
                max_uses, use_count, is_active, expires_at, created_at, revoked_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&token.id)
        .bind(&token.tenant_id)
        .bind(&token.code)
        .bind(token.scope)
        .bind(token.max_discount_bps)
        .bind(&token.issued_by)
        .bind(&token.issued_to)
        .bind(token.max_uses)
        .bind(token.use_count)
        .bind(token.is_active)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Consumes one use of a token.
    ///
    /// Returns the token as it stands after the use, together with the
    /// redemption record.
    pub async fn redeem(
        &self,
        request: &RedeemRequest,
        now: DateTime<Utc>,
    ) -> DbResult<(ManagerialToken, TokenRedemption)> {
        let code = request.code.trim();
        if validate_token_code(code).is_err() {
            return Err(TokenRejection::NotFound.into());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let sql = format!(
            r#"
            UPDATE managerial_tokens
            SET use_count = use_count + 1
            WHERE tenant_id = ?1
              AND code = ?2
              AND is_active = 1
              AND revoked_at IS NULL
              AND expires_at > ?3
              AND use_count < max_uses
              AND scope = ?4
              AND (?5 IS NULL OR max_discount_bps IS NULL OR ?5 <= max_discount_bps)
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        );

        let updated = sqlx::query_as::<_, ManagerialToken>(&sql)
            .bind(&self.tenant_id)
            .bind(code)
            .bind(now)
            .bind(request.scope)
            .bind(request.requested_discount_bps)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(token) = updated else {
            let sql = format!(
                "SELECT {} FROM managerial_tokens WHERE tenant_id = ?1 AND code = ?2",
                TOKEN_COLUMNS
            );
            let current = sqlx::query_as::<_, ManagerialToken>(&sql)
                .bind(&self.tenant_id)
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?;

            let rejection = match current {
                None => TokenRejection::NotFound,
                Some(token) => match token.check_redeemable(request.scope, request.requested_discount(), now) {
                    Err(reason) => reason,
                    // Lost the race for the last use between the update and this read
                    Ok(()) => TokenRejection::Exhausted,
                },
            };

            debug!(reason = %rejection, "Token redemption refused");
            return Err(rejection.into());
        };

        let redemption = TokenRedemption {
            id: Uuid::new_v4().to_string(),
            token_id: token.id.clone(),
            redeemed_by: request.redeemed_by.trim().to_string(),
            reference: request.reference.clone(),
            discount_bps: request.requested_discount_bps,
            redeemed_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO token_redemptions (id, token_id, redeemed_by, reference, discount_bps, redeemed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&redemption.id)
        .bind(&redemption.token_id)
        .bind(&redemption.redeemed_by)
        .bind(&redemption.reference)
        .bind(redemption.discount_bps)
        .bind(redemption.redeemed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            token_id = %token.id,
            scope = %token.scope,
            remaining = token.remaining_uses(),
            "Token redeemed"
        );
        Ok((token, redemption))
    }

    /// Revokes a token. Revoking twice is a no-op.
    pub async fn revoke(&self, code: &str, now: DateTime<Utc>) -> DbResult<ManagerialToken> {
        sqlx::query(
            r#"
            UPDATE managerial_tokens SET is_active = 0, revoked_at = ?3
            WHERE tenant_id = ?1 AND code = ?2 AND revoked_at IS NULL
            "#,
        )
        .bind(&self.tenant_id)
        .bind(code.trim())
        .bind(now)
        .execute(&self.pool)
        .await?;

        let token = self
            .get_by_code(code)
            .await?
            .ok_or_else(|| DbError::not_found("Token", code.trim()))?;

        info!(id = %token.id, "Token revoked");
        Ok(token)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<ManagerialToken>> {
        let sql = format!(
            "SELECT {} FROM managerial_tokens WHERE tenant_id = ?1 AND code = ?2",
            TOKEN_COLUMNS
        );
        let token = sqlx::query_as::<_, ManagerialToken>(&sql)
            .bind(&self.tenant_id)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    /// Tokens that can still be redeemed at `now`, soonest expiry first.
    pub async fn list_active(&self, now: DateTime<Utc>) -> DbResult<Vec<ManagerialToken>> {
        let sql = format!(
            r#"
            SELECT {} FROM managerial_tokens
            WHERE tenant_id = ?1 AND is_active = 1 AND revoked_at IS NULL
              AND expires_at > ?2 AND use_count < max_uses
            ORDER BY expires_at
            "#,
            TOKEN_COLUMNS
        );
        let tokens = sqlx::query_as::<_, ManagerialToken>(&sql)
            .bind(&self.tenant_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }

    pub async fn redemptions(&self, token_id: &str) -> DbResult<Vec<TokenRedemption>> {
        let redemptions = sqlx::query_as::<_, TokenRedemption>(
            r#"
            SELECT r.id, r.token_id, r.redeemed_by, r.reference, r.discount_bps, r.redeemed_at
            FROM token_redemptions r
            INNER JOIN managerial_tokens t ON t.id = r.token_id
            WHERE t.tenant_id = ?1 AND r.token_id = ?2
            ORDER BY r.redeemed_at
            "#,
        )
        .bind(&self.tenant_id)
        .bind(token_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(redemptions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
