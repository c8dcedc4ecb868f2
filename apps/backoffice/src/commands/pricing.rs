//! # Pricing Commands
//!
//! The markup calculator screen and the "Recalcular preços" batch.
//!
//! ## Batch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  preview_reprice()                                                      │
//! │    markup_config() ──► list_all() ──► recalculate_prices()              │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                          RepriceReport { changes, unchanged, skipped }  │
//! │                                                                         │
//! │  apply_reprice()                                                        │
//! │    preview ──► apply_price_changes() (concurrent, no rollback)          │
//! │                        │                                                │
//! │                        ▼                                                │
//! │        RepriceOutcome { report, updated, failed[] }                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::{AppConfig, DbState};
use ipe_core::money::Money;
use ipe_core::pricing::{parse_form_number, MarkupConfig, MarkupInput, RepriceReport};
use ipe_core::validation::{validate_margin_bps, validate_tax_rate_bps};
use ipe_core::Percent;
use ipe_db::repository::product::PriceUpdateFailure;
use ipe_db::SaveOutcome;

/// Raw calculator form. Fields arrive as typed ("1.234,50", "45", "").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupForm {
    pub cost: String,
    pub margin: String,
    pub tax: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupQuote {
    pub cost: Money,
    pub margin: Percent,
    pub tax: Percent,
    pub suggested_price: Money,
}

/// Live price suggestion for the calculator form.
///
/// Unparseable numbers count as zero and a blank margin uses the fallback,
/// so the form always shows a price while the user is typing.
pub fn calculate_markup(form: &MarkupForm) -> MarkupQuote {
    let cost = parse_form_number(&form.cost).unwrap_or(0.0);
    let margin = parse_form_number(&form.margin);
    let tax = parse_form_number(&form.tax).unwrap_or(0.0);

    let input = MarkupInput::from_raw(cost, margin, tax);
    MarkupQuote {
        cost: input.cost,
        margin: input.margin,
        tax: input.tax,
        suggested_price: input.suggested_price(),
    }
}

/// Markup table of the tenant: the saved document, or the configured
/// defaults.
pub async fn markup_config(db: &DbState, config: &AppConfig) -> Result<MarkupConfig, ApiError> {
    Ok(db
        .settings()
        .load_stored::<MarkupConfig>()
        .await?
        .unwrap_or_else(|| config.markup_defaults()))
}

/// Sets one category margin (percent as typed) and saves the table.
pub async fn set_category_margin(
    db: &DbState,
    config: &AppConfig,
    category: &str,
    margin_pct: f64,
) -> Result<SaveOutcome, ApiError> {
    if category.trim().is_empty() {
        return Err(ApiError::validation("category is required"));
    }
    let margin = Percent::from_percentage(margin_pct);
    validate_margin_bps(margin.bps())?;

    let table = markup_config(db, config).await?.with_margin(category, margin);
    let outcome = db.settings().save(&table).await?;

    info!(category = %category, margin_bps = margin.bps(), "Category margin saved");
    Ok(outcome)
}

pub async fn set_tax_estimate(
    db: &DbState,
    config: &AppConfig,
    tax_pct: f64,
) -> Result<SaveOutcome, ApiError> {
    let tax = Percent::from_percentage(tax_pct);
    validate_tax_rate_bps(tax.bps())?;

    let table = markup_config(db, config).await?.with_tax_estimate(tax);
    let outcome = db.settings().save(&table).await?;

    info!(tax_bps = tax.bps(), "Tax estimate saved");
    Ok(outcome)
}

/// Computes the batch without writing anything.
pub async fn preview_reprice(db: &DbState, config: &AppConfig) -> Result<RepriceReport, ApiError> {
    let table = markup_config(db, config).await?;
    let products = db.inner().products().list_all().await?;
    let report = ipe_core::pricing::recalculate_prices(&products, &table);

    debug!(
        changes = report.changes.len(),
        unchanged = report.unchanged,
        skipped = report.skipped.len(),
        "preview_reprice"
    );
    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepriceOutcome {
    pub report: RepriceReport,
    pub updated: usize,
    pub failed: Vec<PriceUpdateFailure>,
}

/// Recomputes and writes every changed price.
///
/// Writes are independent; the outcome lists the ones that failed.
pub async fn apply_reprice(db: &DbState, config: &AppConfig) -> Result<RepriceOutcome, ApiError> {
    let start = Instant::now();
    let report = preview_reprice(db, config).await?;
    let written = db.inner().products().apply_price_changes(&report.changes).await;

    if !written.is_complete() {
        warn!(failed = written.failed.len(), "Some prices were not updated");
    }
    info!(
        updated = written.updated,
        skipped = report.skipped.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "apply_reprice complete"
    );

    Ok(RepriceOutcome {
        report,
        updated: written.updated,
        failed: written.failed,
    })
}
