//! # Report Commands
//!
//! Read-only analytics: Curva ABC, stale inventory ("encalhados") and the
//! manager dashboard. Each command fetches from `ipe-db` once and hands the
//! rows to the pure functions in `ipe-core`.
//!
//! ```text
//! abc_curve ───────► list_in_range + items_in_range ──► revenue_by_product ──► classify
//! stale_inventory ─► list_all + last_sale_by_product ──► turnover::analyze
//! dashboard ───────► list_in_range ──► SalesKpis / daily / stores / salespeople
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{AppConfig, DbState};
use ipe_core::abc::{self, AbcReport};
use ipe_core::commission::{commission_by_salesperson, SalespersonCommission};
use ipe_core::dashboard::{daily_revenue, revenue_by_store, DailyRevenue, DateRange, SalesKpis, StoreRevenue};
use ipe_core::turnover::{self, StaleInventoryReport};

/// Curva ABC over the effective sales in `range`.
pub async fn abc_curve(db: &DbState, range: DateRange) -> Result<AbcReport, ApiError> {
    let start = Instant::now();
    let sales = db.inner().sales();
    let (headers, items) = tokio::try_join!(sales.list_in_range(&range), sales.items_in_range(&range))?;

    let report = abc::classify(abc::revenue_by_product(&headers, &items));
    debug!(
        products = report.entries.len(),
        total_cents = report.total_revenue.cents(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "abc_curve"
    );
    Ok(report)
}

/// Stale inventory as of `today`.
///
/// `threshold_days` overrides the configured `stale_after_days`.
pub async fn stale_inventory(
    db: &DbState,
    config: &AppConfig,
    today: NaiveDate,
    threshold_days: Option<i64>,
) -> Result<StaleInventoryReport, ApiError> {
    let threshold = threshold_days.unwrap_or(config.stale_after_days);
    if threshold < 0 {
        return Err(ApiError::validation("threshold_days must not be negative"));
    }

    let products = db.inner().products().list_all().await?;
    let last_sales = db.inner().sales().last_sale_by_product().await?;

    let report = turnover::analyze(&products, &last_sales, today, threshold);
    debug!(
        stale = report.stale_count,
        never_sold = report.never_sold_count,
        threshold_days = threshold,
        "stale_inventory"
    );
    Ok(report)
}

/// Everything the manager dashboard shows for one range.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDto {
    pub kpis: SalesKpis,
    pub daily: Vec<DailyRevenue>,
    pub stores: Vec<StoreRevenue>,
    pub salespeople: Vec<SalespersonCommission>,
}

pub async fn dashboard(db: &DbState, range: DateRange) -> Result<DashboardDto, ApiError> {
    let sales = db.inner().sales().list_in_range(&range).await?;

    Ok(DashboardDto {
        kpis: SalesKpis::compute(&sales, &range),
        daily: daily_revenue(&sales, &range),
        stores: revenue_by_store(&sales, &range),
        salespeople: commission_by_salesperson(&sales, &range),
    })
}
