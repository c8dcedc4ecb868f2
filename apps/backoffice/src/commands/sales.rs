//! # Sale and Commission Commands
//!
//! ## Commission Snapshot Rule
//! ```text
//! set_commission_rate("pix", 3%)      record_sale(pix, R$ 1.000)
//!          │                                   │
//!          ▼                                   ▼
//!   commission_rates ──── read once ───► sales.commission_rate_bps = 300
//!                                        sales.commission_cents    = 3000
//!          │
//! set_commission_rate("pix", 9%)  ──►  existing sales unchanged
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::DbState;
use ipe_core::commission::{commission_by_salesperson, SalespersonCommission};
use ipe_core::dashboard::DateRange;
use ipe_core::validation::{validate_payment_method, validate_rate_bps};
use ipe_core::{CommissionRate, NewSale, Percent, Sale, SaleItem, SaleStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDto {
    pub id: String,
    pub store_id: String,
    pub salesperson_id: Option<String>,
    pub payment_method: String,
    pub status: SaleStatus,
    pub total_cents: i64,
    pub remaining_cents: i64,
    pub commission_rate_bps: u32,
    pub commission_cents: i64,
    pub sold_at: String,
    pub items: Vec<SaleItemDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemDto {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<SaleItem> for SaleItemDto {
    fn from(item: SaleItem) -> Self {
        SaleItemDto {
            product_id: item.product_id,
            name: item.name_snapshot,
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            line_total_cents: item.line_total_cents,
        }
    }
}

impl SaleDto {
    fn new(sale: Sale, items: Vec<SaleItem>) -> Self {
        SaleDto {
            id: sale.id,
            store_id: sale.store_id,
            salesperson_id: sale.salesperson_id,
            payment_method: sale.payment_method,
            status: sale.status,
            total_cents: sale.total_cents,
            remaining_cents: sale.remaining_cents,
            commission_rate_bps: sale.commission_rate_bps,
            commission_cents: sale.commission_cents,
            sold_at: sale.sold_at.to_rfc3339(),
            items: items.into_iter().map(SaleItemDto::from).collect(),
        }
    }
}

/// Records a sale, snapshotting the current commission rate of its
/// payment method.
pub async fn record_sale(db: &DbState, sale: NewSale) -> Result<SaleDto, ApiError> {
    let (sale, items) = db.inner().sales().record_sale(&sale, Utc::now()).await?;
    info!(
        id = %sale.id,
        total_cents = sale.total_cents,
        commission_cents = sale.commission_cents,
        "Sale recorded"
    );
    Ok(SaleDto::new(sale, items))
}

pub async fn get_sale(db: &DbState, id: &str) -> Result<SaleDto, ApiError> {
    let sales = db.inner().sales();
    let sale = sales
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", id))?;
    let items = sales.items_for_sale(id).await?;
    Ok(SaleDto::new(sale, items))
}

/// Settles the open balance of a pending sale.
pub async fn complete_sale(db: &DbState, id: &str) -> Result<SaleDto, ApiError> {
    db.inner().sales().complete_sale(id).await?;
    get_sale(db, id).await
}

/// Cancels a sale and restocks its items.
pub async fn cancel_sale(db: &DbState, id: &str) -> Result<SaleDto, ApiError> {
    db.inner().sales().cancel_sale(id).await?;
    get_sale(db, id).await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRateDto {
    pub payment_method: String,
    pub rate_bps: u32,
    pub rate_pct: f64,
    pub updated_at: String,
}

impl From<CommissionRate> for CommissionRateDto {
    fn from(rate: CommissionRate) -> Self {
        CommissionRateDto {
            rate_pct: rate.rate().percentage(),
            payment_method: rate.payment_method,
            rate_bps: rate.rate_bps,
            updated_at: rate.updated_at.to_rfc3339(),
        }
    }
}

/// Sets the commission percentage for a payment method. Only sales
/// recorded afterwards use it.
pub async fn set_commission_rate(
    db: &DbState,
    payment_method: &str,
    rate_pct: f64,
) -> Result<CommissionRateDto, ApiError> {
    validate_payment_method(payment_method)?;
    if !rate_pct.is_finite() || rate_pct < 0.0 {
        return Err(ApiError::validation("rate must be a non-negative number"));
    }
    let rate = Percent::from_percentage(rate_pct);
    validate_rate_bps("commission_rate", rate.bps())?;

    let saved = db.inner().commissions().set_rate(payment_method, rate).await?;
    Ok(saved.into())
}

pub async fn list_commission_rates(db: &DbState) -> Result<Vec<CommissionRateDto>, ApiError> {
    let rates = db.inner().commissions().list().await?;
    Ok(rates.into_iter().map(CommissionRateDto::from).collect())
}

pub async fn remove_commission_rate(db: &DbState, payment_method: &str) -> Result<bool, ApiError> {
    Ok(db.inner().commissions().remove(payment_method).await?)
}

/// Commission owed per salesperson in `range`, from the stored snapshots.
pub async fn commission_report(
    db: &DbState,
    range: DateRange,
) -> Result<Vec<SalespersonCommission>, ApiError> {
    let sales = db.inner().sales().list_in_range(&range).await?;
    Ok(commission_by_salesperson(&sales, &range))
}
