//! # Commission Rate Repository
//!
//! Rates are keyed by payment method. Changing a rate only affects sales
//! recorded afterwards; `sales` rows are never touched from here.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use ipe_core::commission::{normalize_method, CommissionTable};
use ipe_core::{CommissionRate, Percent};

#[derive(Debug, Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl CommissionRepository {
    pub fn new(pool: SqlitePool, tenant_id: &str) -> Self {
        CommissionRepository {
            pool,
            tenant_id: tenant_id.to_string(),
        }
    }

    /// Inserts or replaces the rate for a payment method.
    pub async fn set_rate(&self, payment_method: &str, rate: Percent) -> DbResult<CommissionRate> {
        let method = normalize_method(payment_method);
        let now = Utc::now();

        info!(payment_method = %method, rate_bps = rate.bps(), "Setting commission rate");

        sqlx::query(
            r#"
            INSERT INTO commission_rates (tenant_id, payment_method, rate_bps, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (tenant_id, payment_method)
            DO UPDATE SET rate_bps = excluded.rate_bps, updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.tenant_id)
        .bind(&method)
        .bind(rate.bps())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(CommissionRate {
            tenant_id: self.tenant_id.clone(),
            payment_method: method,
            rate_bps: rate.bps(),
            updated_at: now,
        })
    }

    pub async fn get(&self, payment_method: &str) -> DbResult<Option<CommissionRate>> {
        let rate = sqlx::query_as::<_, CommissionRate>(
            r#"
            SELECT tenant_id, payment_method, rate_bps, updated_at
            FROM commission_rates
            WHERE tenant_id = ?1 AND payment_method = ?2
            "#,
        )
        .bind(&self.tenant_id)
        .bind(normalize_method(payment_method))
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }

    pub async fn list(&self) -> DbResult<Vec<CommissionRate>> {
        let rates = sqlx::query_as::<_, CommissionRate>(
            r#"
            SELECT tenant_id, payment_method, rate_bps, updated_at
            FROM commission_rates
            WHERE tenant_id = ?1
            ORDER BY payment_method
            "#,
        )
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rates)
    }

    pub async fn table(&self) -> DbResult<CommissionTable> {
        Ok(CommissionTable::from_rates(&self.list().await?))
    }

    /// Removes a rate; the method then earns 0% on new sales.
    pub async fn remove(&self, payment_method: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM commission_rates WHERE tenant_id = ?1 AND payment_method = ?2",
        )
        .bind(&self.tenant_id)
        .bind(normalize_method(payment_method))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use ipe_core::Percent;

    #[tokio::test]
    async fn test_set_rate_upserts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.commissions();

        repo.set_rate("PIX", Percent::from_bps(300)).await.unwrap();
        repo.set_rate("pix", Percent::from_bps(350)).await.unwrap();
        repo.set_rate("credito", Percent::from_bps(200)).await.unwrap();

        let rates = repo.list().await.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[1].payment_method, "pix");
        assert_eq!(rates[1].rate_bps, 350);

        let table = repo.table().await.unwrap();
        assert_eq!(table.rate_for("Credito").bps(), 200);

        assert!(repo.remove("pix").await.unwrap());
        assert!(repo.get("pix").await.unwrap().is_none());
    }
}
