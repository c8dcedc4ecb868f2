//! # Pricing Module
//!
//! Markup calculator and batch repricing.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  price = ceil( cost × (1 + margin/100) × (1 + tax/100) )               │
//! │                                                                         │
//! │  cost    R$ 100,00                                                     │
//! │  margin  45%   (category "sofas", or the 45% fallback)                 │
//! │  tax     18%   (global tax estimate)                                   │
//! │                                                                         │
//! │  100 × 1.45 × 1.18 = 171.10 ──► ceil ──► R$ 172,00                     │
//! │                                                                         │
//! │  Integer form: cents × (10000 + m_bps) × (10000 + t_bps) / 10^8        │
//! │  then rounded UP to a whole real.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Permissive Input
//! Form values never raise errors here: negative or non-numeric numbers
//! become zero and a missing margin uses [`FALLBACK_MARGIN_BPS`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Percent, Product};
use crate::FALLBACK_MARGIN_BPS;

// =============================================================================
// Single Product
// =============================================================================

/// Suggested sale price for a unit cost.
///
/// Monotonically non-decreasing in `cost`, `margin` and `tax`. Negative cost
/// is treated as zero; results beyond `i64` centavos saturate.
///
/// ## Example
/// ```rust
/// use ipe_core::money::Money;
/// use ipe_core::pricing::suggested_price;
/// use ipe_core::Percent;
///
/// let price = suggested_price(
///     Money::from_reais(100, 0),
///     Percent::from_bps(4500),
///     Percent::from_bps(1800),
/// );
/// assert_eq!(price, Money::from_reais(172, 0));
/// ```
pub fn suggested_price(cost: Money, margin: Percent, tax: Percent) -> Money {
    const SCALE: i128 = 10_000;
    // Dividing by SCALE² turns the product back into centavos, and by 100
    // more into reais, so a single ceiling division rounds up to a real.
    const PER_REAL: i128 = SCALE * SCALE * 100;

    let cents = cost.clamp_non_negative().cents() as i128;
    // Absurd form values saturate at the largest representable price
    let price_cents = cents
        .checked_mul(SCALE + margin.bps() as i128)
        .and_then(|n| n.checked_mul(SCALE + tax.bps() as i128))
        .and_then(|n| n.checked_add(PER_REAL - 1))
        .and_then(|n| (n / PER_REAL).checked_mul(100))
        .and_then(|c| i64::try_from(c).ok());

    Money::from_cents(price_cents.unwrap_or(i64::MAX))
}

/// Raw markup input as it comes from a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarkupInput {
    pub cost: Money,
    pub margin: Percent,
    pub tax: Percent,
}

impl MarkupInput {
    /// Builds an input from loosely-typed numbers.
    ///
    /// ## Rules
    /// - `cost_reais`: negative, NaN or infinite → 0
    /// - `margin_pct`: `None` or NaN → 45% fallback; negative → 0
    /// - `tax_pct`: negative, NaN or infinite → 0
    pub fn from_raw(cost_reais: f64, margin_pct: Option<f64>, tax_pct: f64) -> Self {
        let cost = if cost_reais.is_finite() && cost_reais > 0.0 {
            Money::from_cents((cost_reais * 100.0).round() as i64)
        } else {
            Money::zero()
        };

        let margin = match margin_pct {
            Some(pct) if !pct.is_nan() => Percent::from_percentage(pct),
            _ => Percent::from_bps(FALLBACK_MARGIN_BPS),
        };

        MarkupInput {
            cost,
            margin,
            tax: Percent::from_percentage(tax_pct),
        }
    }

    pub fn suggested_price(&self) -> Money {
        suggested_price(self.cost, self.margin, self.tax)
    }
}

/// Parses a number typed in a Brazilian form ("1.299,90", "45,5", "18").
///
/// Returns `None` for anything that is not a number; callers decide the
/// default.
pub fn parse_form_number(input: &str) -> Option<f64> {
    let trimmed = input.trim().trim_start_matches("R$").trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Markup Configuration
// =============================================================================

/// Category margins plus the global tax estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MarkupConfig {
    /// Category key (lowercase) → margin.
    pub category_margins: BTreeMap<String, Percent>,
    pub fallback_margin: Percent,
    pub tax_estimate: Percent,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        MarkupConfig {
            category_margins: BTreeMap::new(),
            fallback_margin: Percent::from_bps(FALLBACK_MARGIN_BPS),
            tax_estimate: Percent::zero(),
        }
    }
}

impl MarkupConfig {
    pub fn with_tax_estimate(mut self, tax: Percent) -> Self {
        self.tax_estimate = tax;
        self
    }

    pub fn with_margin(mut self, category: &str, margin: Percent) -> Self {
        self.category_margins.insert(normalize_category(category), margin);
        self
    }

    /// Configured margin for a category, or the fallback.
    pub fn margin_for(&self, category: &str) -> Percent {
        self.category_margins
            .get(&normalize_category(category))
            .copied()
            .unwrap_or(self.fallback_margin)
    }

    pub fn price_for(&self, category: &str, cost: Money) -> Money {
        suggested_price(cost, self.margin_for(category), self.tax_estimate)
    }
}

fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

// =============================================================================
// Batch Repricing
// =============================================================================

/// Why a product was left out of a batch reprice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No cost, or a cost of zero or less.
    MissingCost,
    MissingCategory,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SkippedProduct {
    pub product_id: String,
    pub sku: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub product_id: String,
    pub sku: String,
    pub old_price: Money,
    pub new_price: Money,
    pub margin: Percent,
}

/// Outcome of [`recalculate_prices`]. Nothing is written; the storage layer
/// applies `changes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RepriceReport {
    pub changes: Vec<PriceChange>,
    pub unchanged: usize,
    pub skipped: Vec<SkippedProduct>,
}

impl RepriceReport {
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}

/// Computes suggested prices for a batch of products.
///
/// ## User Workflow
/// ```text
/// Manager edits category margins ──► "Recalcular preços"
///      │
///      ▼
/// recalculate_prices(products, config) ← THIS FUNCTION
///      │
///      ├── inactive           → skipped (Inactive)
///      ├── no cost / cost ≤ 0 → skipped (MissingCost)
///      ├── no category        → skipped (MissingCategory)
///      ├── same price         → unchanged
///      └── otherwise          → PriceChange
///      │
///      ▼
/// Storage applies changes concurrently, counts successes/failures
/// ```
pub fn recalculate_prices(products: &[Product], config: &MarkupConfig) -> RepriceReport {
    let mut report = RepriceReport::default();

    for product in products {
        let skip = |reason| SkippedProduct {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            reason,
        };

        if !product.is_active {
            report.skipped.push(skip(SkipReason::Inactive));
            continue;
        }

        let cost = match product.cost() {
            Some(cost) if cost.is_positive() => cost,
            _ => {
                report.skipped.push(skip(SkipReason::MissingCost));
                continue;
            }
        };

        let category = match product.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category,
            _ => {
                report.skipped.push(skip(SkipReason::MissingCategory));
                continue;
            }
        };

        let margin = config.margin_for(category);
        let new_price = suggested_price(cost, margin, config.tax_estimate);

        if new_price == product.price() {
            report.unchanged += 1;
        } else {
            report.changes.push(PriceChange {
                product_id: product.id.clone(),
                sku: product.sku.clone(),
                old_price: product.price(),
                new_price,
                margin,
            });
        }
    }

    report
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, category: Option<&str>, cost: Option<i64>, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            sku: format!("SKU-{}", id),
            name: format!("Produto {}", id),
            category: category.map(str::to_string),
            cost_cents: cost,
            price_cents: price,
            stock_quantity: 1,
            is_active: true,
            in_showroom: false,
            showroom_location: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reference_example() {
        let price = suggested_price(
            Money::from_reais(100, 0),
            Percent::from_bps(4500),
            Percent::from_bps(1800),
        );
        assert_eq!(price.cents(), 17200);
    }

    #[test]
    fn test_exact_whole_result_is_not_bumped() {
        // 100 × 1.5 × 1.0 = 150 exactly
        let price = suggested_price(Money::from_reais(100, 0), Percent::from_bps(5000), Percent::zero());
        assert_eq!(price.cents(), 15000);
    }

    #[test]
    fn test_zero_and_negative_cost() {
        let margin = Percent::from_bps(4500);
        let tax = Percent::from_bps(1800);
        assert_eq!(suggested_price(Money::zero(), margin, tax), Money::zero());
        assert_eq!(suggested_price(Money::from_cents(-5000), margin, tax), Money::zero());
    }

    #[test]
    fn test_matches_float_formula_on_grid() {
        for cost_cents in [1_i64, 99, 1000, 4990, 123456, 999999] {
            for margin_bps in [0_u32, 1000, 4500, 12000] {
                for tax_bps in [0_u32, 700, 1800] {
                    let price = suggested_price(
                        Money::from_cents(cost_cents),
                        Percent::from_bps(margin_bps),
                        Percent::from_bps(tax_bps),
                    );
                    // Exact rational check: price is the smallest whole real
                    // with price × 10^8 ≥ cost × (1+m) × (1+t) (all in cents/bps).
                    let exact = cost_cents as i128
                        * (10_000 + margin_bps as i128)
                        * (10_000 + tax_bps as i128);
                    let p = price.cents() as i128 * 100_000_000;
                    assert!(p >= exact);
                    assert!(p - 100 * 100_000_000 < exact);
                    assert_eq!(price.cents() % 100, 0);
                }
            }
        }
    }

    #[test]
    fn test_monotonic_in_each_argument() {
        let base_cost = Money::from_cents(73_333);
        let base_margin = Percent::from_bps(4500);
        let base_tax = Percent::from_bps(1800);
        let base = suggested_price(base_cost, base_margin, base_tax);

        for step in 1..50 {
            let cost = Money::from_cents(base_cost.cents() + step * 37);
            assert!(suggested_price(cost, base_margin, base_tax) >= base);

            let margin = Percent::from_bps(base_margin.bps() + step as u32 * 13);
            assert!(suggested_price(base_cost, margin, base_tax) >= base);

            let tax = Percent::from_bps(base_tax.bps() + step as u32 * 11);
            assert!(suggested_price(base_cost, base_margin, tax) >= base);
        }
    }

    #[test]
    fn test_huge_inputs_saturate() {
        let input = MarkupInput::from_raw(1e30, Some(1e12), 1e12);
        assert_eq!(input.cost.cents(), i64::MAX);
        assert_eq!(input.suggested_price().cents(), i64::MAX);

        let max = Percent::from_bps(u32::MAX);
        let big = suggested_price(Money::from_reais(1_000_000, 0), max, max);
        assert!(big >= suggested_price(Money::from_reais(1_000_000, 0), max, Percent::zero()));
    }

    #[test]
    fn test_markup_input_from_raw() {
        let input = MarkupInput::from_raw(100.0, None, 18.0);
        assert_eq!(input.margin.bps(), FALLBACK_MARGIN_BPS);
        assert_eq!(input.suggested_price().cents(), 17200);

        let input = MarkupInput::from_raw(-10.0, Some(-5.0), f64::NAN);
        assert_eq!(input.cost, Money::zero());
        assert_eq!(input.margin, Percent::zero());
        assert_eq!(input.tax, Percent::zero());

        let input = MarkupInput::from_raw(f64::NAN, Some(f64::NAN), 0.0);
        assert_eq!(input.cost, Money::zero());
        assert_eq!(input.margin.bps(), FALLBACK_MARGIN_BPS);
    }

    #[test]
    fn test_parse_form_number() {
        assert_eq!(parse_form_number("45"), Some(45.0));
        assert_eq!(parse_form_number("45,5"), Some(45.5));
        assert_eq!(parse_form_number("R$ 1.299,90"), Some(1299.90));
        assert_eq!(parse_form_number("18%"), Some(18.0));
        assert_eq!(parse_form_number("12.5"), Some(12.5));
        assert_eq!(parse_form_number("abc"), None);
        assert_eq!(parse_form_number("   "), None);
    }

    #[test]
    fn test_margin_lookup_falls_back() {
        let config = MarkupConfig::default()
            .with_margin("Sofas", Percent::from_bps(6000))
            .with_tax_estimate(Percent::from_bps(1800));

        assert_eq!(config.margin_for("sofas").bps(), 6000);
        assert_eq!(config.margin_for(" SOFAS ").bps(), 6000);
        assert_eq!(config.margin_for("colchoes").bps(), FALLBACK_MARGIN_BPS);
    }

    #[test]
    fn test_recalculate_prices_reports_skips() {
        let config = MarkupConfig::default()
            .with_margin("mesas", Percent::from_bps(5000))
            .with_tax_estimate(Percent::from_bps(1000));

        let mut inactive = product("4", Some("mesas"), Some(10000), 0);
        inactive.is_active = false;

        let products = vec![
            // 100 × 1.5 × 1.1 = 165
            product("1", Some("mesas"), Some(10000), 12000),
            product("2", None, Some(10000), 0),
            product("3", Some("mesas"), None, 0),
            inactive,
            product("5", Some("mesas"), Some(10000), 16500),
            product("6", Some("mesas"), Some(0), 0),
            product("7", Some("  "), Some(10000), 0),
        ];

        let report = recalculate_prices(&products, &config);

        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].product_id, "1");
        assert_eq!(report.changes[0].old_price.cents(), 12000);
        assert_eq!(report.changes[0].new_price.cents(), 16500);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.skipped_for(SkipReason::MissingCategory), 2);
        assert_eq!(report.skipped_for(SkipReason::MissingCost), 2);
        assert_eq!(report.skipped_for(SkipReason::Inactive), 1);
        assert_eq!(
            report.changes.len() + report.unchanged + report.skipped.len(),
            products.len()
        );
    }
}
