//! # Sale Repository
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale(NewSale)                     one transaction               │
//! │                                                                         │
//! │  1. read commission_rates[payment_method]  (missing → 0%)              │
//! │  2. snapshot = rate × total, rounded half-up                           │
//! │  3. INSERT sales (… commission_rate_bps, commission_cents …)           │
//! │  4. INSERT sale_items (name and unit price frozen)                     │
//! │  5. stock_quantity -= quantity per item                                │
//! │                                                                         │
//! │  Later rate changes never rewrite step 3.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ipe_core::commission::{normalize_method, CommissionSnapshot};
use ipe_core::dashboard::DateRange;
use ipe_core::{NewSale, Percent, Sale, SaleItem, SaleStatus};

const SALE_COLUMNS: &str = r#"
    id, tenant_id, store_id, salesperson_id, payment_method, status,
    total_cents, remaining_cents, commission_rate_bps, commission_cents,
    sold_at, created_at
"#;

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, tenant_id: &str) -> Self {
        SaleRepository {
            pool,
            tenant_id: tenant_id.to_string(),
        }
    }

    /// Records a sale with its items and commission snapshot.
    pub async fn record_sale(&self, new: &NewSale, now: DateTime<Utc>) -> DbResult<(Sale, Vec<SaleItem>)> {
        new.validate()?;

        let method = normalize_method(&new.payment_method);
        let total = new.total();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let rate_bps: Option<u32> = sqlx::query_scalar(
            "SELECT rate_bps FROM commission_rates WHERE tenant_id = ?1 AND payment_method = ?2",
        )
        .bind(&self.tenant_id)
        .bind(&method)
        .fetch_optional(&mut *tx)
        .await?;

        let snapshot = CommissionSnapshot::new(total, Percent::from_bps(rate_bps.unwrap_or(0)));

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.tenant_id.clone(),
            store_id: new.store_id.trim().to_string(),
            salesperson_id: new.salesperson_id.clone(),
            payment_method: method,
            status: new.initial_status(),
            total_cents: total.cents(),
            remaining_cents: new.remaining().cents(),
            commission_rate_bps: snapshot.rate_bps,
            commission_cents: snapshot.amount.cents(),
            sold_at: new.sold_at.unwrap_or(now),
            created_at: now,
        };

        debug!(id = %sale.id, total = %total, commission = %snapshot.amount, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, store_id, salesperson_id, payment_method, status,
                total_cents, remaining_cents, commission_rate_bps, commission_cents,
                sold_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.store_id)
        .bind(&sale.salesperson_id)
        .bind(&sale.payment_method)
        .bind(sale.status)
        .bind(sale.total_cents)
        .bind(sale.remaining_cents)
        .bind(sale.commission_rate_bps)
        .bind(sale.commission_cents)
        .bind(sale.sold_at)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new.items.len());
        for line in &new.items {
            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                name_snapshot: line.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                line_total_cents: line.unit_price_cents * line.quantity,
            };

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, name_snapshot,
                    quantity, unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;

            let moved = sqlx::query(
                r#"
                UPDATE products SET stock_quantity = stock_quantity - ?3, updated_at = ?4
                WHERE id = ?1 AND tenant_id = ?2
                "#,
            )
            .bind(&item.product_id)
            .bind(&self.tenant_id)
            .bind(item.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if moved.rows_affected() == 0 {
                return Err(DbError::not_found("Product", &item.product_id));
            }

            items.push(item);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            id = %sale.id,
            status = %sale.status,
            items = items.len(),
            "Sale recorded"
        );
        Ok((sale, items))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1 AND tenant_id = ?2", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .bind(&self.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    pub async fn items_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, name_snapshot,
                   quantity, unit_price_cents, line_total_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Sales of every status sold within `range`, oldest first.
    pub async fn list_in_range(&self, range: &DateRange) -> DbResult<Vec<Sale>> {
        let sql = format!(
            r#"
            SELECT {} FROM sales
            WHERE tenant_id = ?1 AND sold_at >= ?2 AND sold_at < ?3
            ORDER BY sold_at, rowid
            "#,
            SALE_COLUMNS
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(&self.tenant_id)
            .bind(range.start_at())
            .bind(range.end_exclusive_at())
            .fetch_all(&self.pool)
            .await?;

        debug!(count = sales.len(), start = %range.start, end = %range.end, "Listed sales");
        Ok(sales)
    }

    /// Line items of the sales sold within `range`, in sale order.
    pub async fn items_in_range(&self, range: &DateRange) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT si.id, si.sale_id, si.product_id, si.name_snapshot,
                   si.quantity, si.unit_price_cents, si.line_total_cents
            FROM sale_items si
            INNER JOIN sales s ON s.id = si.sale_id
            WHERE s.tenant_id = ?1 AND s.sold_at >= ?2 AND s.sold_at < ?3
            ORDER BY s.sold_at, s.rowid, si.rowid
            "#,
        )
        .bind(&self.tenant_id)
        .bind(range.start_at())
        .bind(range.end_exclusive_at())
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Latest non-cancelled sale date per product, all time.
    pub async fn last_sale_by_product(&self) -> DbResult<HashMap<String, DateTime<Utc>>> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT si.product_id, MAX(s.sold_at)
            FROM sale_items si
            INNER JOIN sales s ON s.id = si.sale_id
            WHERE s.tenant_id = ?1 AND s.status != 'cancelled'
            GROUP BY si.product_id
            "#,
        )
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Settles the balance of a pending sale.
    pub async fn complete_sale(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET status = 'completed', remaining_cents = 0
            WHERE id = ?1 AND tenant_id = ?2 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (pending)", id));
        }

        info!(id = %id, "Sale completed");
        Ok(())
    }

    /// Cancels a sale and returns its items to stock.
    ///
    /// The commission snapshot stays on the row; reports skip cancelled
    /// sales.
    pub async fn cancel_sale(&self, id: &str) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET status = ?3
            WHERE id = ?1 AND tenant_id = ?2 AND status != 'cancelled'
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .bind(SaleStatus::Cancelled)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + (
                SELECT COALESCE(SUM(quantity), 0) FROM sale_items
                WHERE sale_id = ?1 AND product_id = products.id
            )
            WHERE tenant_id = ?2
              AND id IN (SELECT product_id FROM sale_items WHERE sale_id = ?1)
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, "Sale cancelled");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::sample_product;
    use crate::{Database, DbConfig};
    use chrono::{NaiveDate, TimeZone};
    use ipe_core::NewSaleItem;

    async fn seeded() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("SOF-001", Some("sofas"), Some(100000));
        db.products().insert(&product).await.unwrap();
        (db, product.id)
    }

    fn new_sale(product_id: &str, method: &str, unit: i64, qty: i64, paid: i64) -> NewSale {
        NewSale {
            store_id: "loja-centro".to_string(),
            salesperson_id: Some("ana".to_string()),
            payment_method: method.to_string(),
            items: vec![NewSaleItem {
                product_id: product_id.to_string(),
                name: "Sofá 3 lugares".to_string(),
                quantity: qty,
                unit_price_cents: unit,
            }],
            amount_paid_cents: paid,
            sold_at: None,
        }
    }

    #[tokio::test]
    async fn test_record_sale_snapshots_commission() {
        let (db, product_id) = seeded().await;
        db.commissions().set_rate("pix", Percent::from_bps(300)).await.unwrap();

        let (sale, items) = db
            .sales()
            .record_sale(&new_sale(&product_id, "PIX", 150000, 2, 300000), Utc::now())
            .await
            .unwrap();

        assert_eq!(sale.total_cents, 300000);
        assert_eq!(sale.commission_rate_bps, 300);
        assert_eq!(sale.commission_cents, 9000);
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(items.len(), 1);

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_rate_change_leaves_recorded_commission() {
        let (db, product_id) = seeded().await;
        db.commissions().set_rate("credito", Percent::from_bps(200)).await.unwrap();

        let (sale, _) = db
            .sales()
            .record_sale(&new_sale(&product_id, "credito", 100000, 1, 0), Utc::now())
            .await
            .unwrap();

        db.commissions().set_rate("credito", Percent::from_bps(900)).await.unwrap();

        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.commission_rate_bps, 200);
        assert_eq!(stored.commission_cents, 2000);
        assert_eq!(stored.status, SaleStatus::Pending);
        assert_eq!(stored.remaining_cents, 100000);
    }

    #[tokio::test]
    async fn test_unknown_method_earns_zero() {
        let (db, product_id) = seeded().await;
        let (sale, _) = db
            .sales()
            .record_sale(&new_sale(&product_id, "boleto", 100000, 1, 100000), Utc::now())
            .await
            .unwrap();
        assert_eq!(sale.commission_cents, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back() {
        let (db, _) = seeded().await;
        let err = db
            .sales()
            .record_sale(&new_sale("nope", "pix", 100, 1, 100), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. } | DbError::NotFound { .. }));

        let range = DateRange::last_n_days(Utc::now().date_naive(), 1);
        assert!(db.sales().list_in_range(&range).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_range_queries_and_last_sale() {
        let (db, product_id) = seeded().await;
        let day = |d: u32| Utc.with_ymd_and_hms(2026, 10, d, 12, 0, 0).unwrap();

        let mut early = new_sale(&product_id, "pix", 1000, 1, 1000);
        early.sold_at = Some(day(1));
        let mut late = new_sale(&product_id, "pix", 2000, 1, 2000);
        late.sold_at = Some(day(10));
        let mut cancelled = new_sale(&product_id, "pix", 3000, 1, 3000);
        cancelled.sold_at = Some(day(15));

        db.sales().record_sale(&early, day(1)).await.unwrap();
        db.sales().record_sale(&late, day(10)).await.unwrap();
        let (c, _) = db.sales().record_sale(&cancelled, day(15)).await.unwrap();
        db.sales().cancel_sale(&c.id).await.unwrap();

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 10).unwrap(),
        );
        let sales = db.sales().list_in_range(&range).await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].total_cents, 1000);
        assert_eq!(db.sales().items_in_range(&range).await.unwrap().len(), 2);

        let last = db.sales().last_sale_by_product().await.unwrap();
        assert_eq!(last.get(&product_id), Some(&day(10)));

        // Cancelled sale returned its unit: 5 - 3 + 1
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 3);

        assert!(db.sales().cancel_sale(&c.id).await.is_err());
    }

    #[tokio::test]
    async fn test_complete_pending_sale() {
        let (db, product_id) = seeded().await;
        let (sale, _) = db
            .sales()
            .record_sale(&new_sale(&product_id, "crediario", 50000, 1, 10000), Utc::now())
            .await
            .unwrap();
        assert_eq!(sale.remaining_cents, 40000);

        db.sales().complete_sale(&sale.id).await.unwrap();
        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Completed);
        assert_eq!(stored.remaining_cents, 0);

        assert!(db.sales().complete_sale(&sale.id).await.is_err());
    }
}
