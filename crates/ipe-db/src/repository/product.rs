//! # Product Repository
//!
//! Catalog CRUD, stock movements and the batch price writer.
//!
//! ## Batch Price Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RepriceReport.changes                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  apply_price_changes()                                                  │
//! │       │  one task per product (JoinSet)                                 │
//! │       ├──► UPDATE products SET price_cents = ? WHERE id = ?  ✓          │
//! │       ├──► UPDATE ...                                        ✓          │
//! │       └──► UPDATE ...                                        ✗ logged   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PriceUpdateReport { updated: 2, failed: [{id, message}] }             │
//! │                                                                         │
//! │  Writes are independent: a failure never rolls back the others.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use ipe_core::pricing::PriceChange;
use ipe_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, tenant_id, sku, name, category, cost_cents, price_cents,
    stock_quantity, is_active, in_showroom, showroom_location,
    created_at, updated_at
"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdateFailure {
    pub product_id: String,
    pub sku: String,
    pub message: String,
}

/// Result of a batch price write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdateReport {
    pub updated: usize,
    pub failed: Vec<PriceUpdateFailure>,
}

impl PriceUpdateReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, tenant_id: &str) -> Self {
        ProductRepository {
            pool,
            tenant_id: tenant_id.to_string(),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = ?1 AND tenant_id = ?2",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&self.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE sku = ?1 AND tenant_id = ?2",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .bind(&self.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Active products ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 AND is_active = 1 ORDER BY name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&self.tenant_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed active products");
        Ok(products)
    }

    /// Every product of the tenant, inactive included.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 ORDER BY name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&self.tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Products on display in a showroom.
    pub async fn list_showroom(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 AND in_showroom = 1 ORDER BY showroom_location, name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&self.tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1")
            .bind(&self.tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts a product under this repository's tenant.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already used by the tenant
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, "Inserting product");

        let mut product = product.clone();
        product.tenant_id = self.tenant_id.clone();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, category, cost_cents, price_cents,
                stock_quantity, is_active, in_showroom, showroom_location,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.cost_cents)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(product.in_showroom)
        .bind(&product.showroom_location)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.sku.clone(),
            },
            other => other,
        })?;

        Ok(product)
    }

    /// Updates catalog fields (not stock, not price).
    pub async fn update_details(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?3,
                name = ?4,
                category = ?5,
                cost_cents = ?6,
                in_showroom = ?7,
                showroom_location = ?8,
                is_active = ?9,
                updated_at = ?10
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(&product.id)
        .bind(&self.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.cost_cents)
        .bind(product.in_showroom)
        .bind(&product.showroom_location)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    pub async fn update_price(&self, id: &str, price_cents: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET price_cents = ?3, updated_at = ?4 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(&self.tenant_id)
        .bind(price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Writes every change as an independent concurrent update.
    pub async fn apply_price_changes(&self, changes: &[PriceChange]) -> PriceUpdateReport {
        info!(count = changes.len(), "Applying price changes");

        let mut tasks = JoinSet::new();
        for change in changes.iter().cloned() {
            let repo = self.clone();
            tasks.spawn(async move {
                let result = repo
                    .update_price(&change.product_id, change.new_price.cents())
                    .await;
                (change, result)
            });
        }

        let mut report = PriceUpdateReport::default();
        let mut finished: HashSet<String> = HashSet::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((change, Ok(()))) => {
                    finished.insert(change.product_id);
                    report.updated += 1;
                }
                Ok((change, Err(e))) => {
                    warn!(product_id = %change.product_id, error = %e, "Price update failed");
                    finished.insert(change.product_id.clone());
                    report.failed.push(PriceUpdateFailure {
                        product_id: change.product_id,
                        sku: change.sku,
                        message: e.to_string(),
                    });
                }
                Err(e) => warn!(error = %e, "Price update task did not complete"),
            }
        }

        // A panicked task cannot report its product; name them here
        for change in changes.iter().filter(|c| !finished.contains(&c.product_id)) {
            report.failed.push(PriceUpdateFailure {
                product_id: change.product_id.clone(),
                sku: change.sku.clone(),
                message: "update task aborted".to_string(),
            });
        }

        info!(
            updated = report.updated,
            failed = report.failed.len(),
            "Price changes applied"
        );
        report
    }

    /// Adds `delta` units (negative for sales) to stock.
    pub async fn update_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Updating stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Puts a display unit in a showroom, or takes it out (`None`).
    pub async fn set_showroom(&self, id: &str, location: Option<&str>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET in_showroom = ?3, showroom_location = ?4, updated_at = ?5
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .bind(location.is_some())
        .bind(location)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft delete.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?3 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(&self.tenant_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
