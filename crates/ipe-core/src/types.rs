//! # Domain Types
//!
//! Records shared by every layer of the back office.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │ CommissionRate  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku, category  │   │  store, method  │   │  payment_method │       │
//! │  │  cost / price   │   │  total, saldo   │   │  rate_bps       │       │
//! │  │  stock          │   │  commission     │   │                 │       │
//! │  │  showroom       │   │   (snapshot)    │   │                 │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ 1..n                                  │
//! │                        ┌────────▼────────┐   ┌─────────────────┐       │
//! │                        │    SaleItem     │   │    Percent      │       │
//! │                        │  name_snapshot  │   │  bps (u32)      │       │
//! │                        │  qty × unit     │   │  4500 = 45%     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tokens, employees and settings documents live in their own modules
//! ([`crate::token`], [`crate::hr`], [`crate::settings`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{validate_payment_method, validate_price_cents, validate_quantity};

// =============================================================================
// Percent
// =============================================================================

/// A percentage in basis points (1 bp = 0.01%).
///
/// Margins, tax estimates, commission rates and discount caps all use it,
/// so every percentage calculation is exact integer math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Converts a percentage as typed in a form (`45.5` = 45.5%).
    ///
    /// Negative, NaN and infinite input maps to zero.
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return Percent(0);
        }
        let bps = (pct * 100.0).round();
        if bps >= u32::MAX as f64 {
            Percent(u32::MAX)
        } else {
            Percent(bps as u32)
        }
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A furniture item in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub sku: String,
    pub name: String,

    /// Category key used to look up the markup ("sofas", "mesas", ...).
    pub category: Option<String>,

    /// Unit cost in centavos. Unknown for items imported without invoice.
    pub cost_cents: Option<i64>,

    /// Sale price in centavos.
    pub price_cents: i64,

    /// Sellable units in stock (showroom units excluded).
    pub stock_quantity: i64,

    /// Soft delete flag.
    pub is_active: bool,

    /// A display unit is kept in a showroom (mostruário).
    pub in_showroom: bool,

    /// Where the display unit is ("Loja Centro - Ala 2").
    pub showroom_location: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Option<Money> {
        self.cost_cents.map(Money::from_cents)
    }

    /// Stock valued at cost. Unknown cost or negative stock count as zero.
    pub fn stock_value(&self) -> Money {
        match self.cost() {
            Some(cost) => cost.clamp_non_negative().multiply_quantity(self.stock_quantity.max(0)),
            None => Money::zero(),
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Ordered, awaiting payment or delivery.
    Pending,
    /// Paid and delivered.
    Completed,
    /// Cancelled; ignored by every report.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleStatus::Pending => write!(f, "pending"),
            SaleStatus::Completed => write!(f, "completed"),
            SaleStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale header.
///
/// `commission_rate_bps` and `commission_cents` are snapshots taken when
/// the sale was recorded. Later commission rate changes never touch them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    pub salesperson_id: Option<String>,
    pub payment_method: String,
    pub status: SaleStatus,
    pub total_cents: i64,
    /// Balance still to be received (crediário, boleto parcelado, ...).
    pub remaining_cents: i64,
    pub commission_rate_bps: u32,
    pub commission_cents: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_cents)
    }

    #[inline]
    pub fn commission(&self) -> Money {
        Money::from_cents(self.commission_cents)
    }

    /// Whether the sale counts for revenue, ABC and turnover.
    #[inline]
    pub fn is_effective(&self) -> bool {
        self.status != SaleStatus::Cancelled
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item. Name and price are frozen at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// New Sale (input)
// =============================================================================

/// Input for recording a sale. Totals and commission are derived, never
/// supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub store_id: String,
    pub salesperson_id: Option<String>,
    pub payment_method: String,
    pub items: Vec<NewSaleItem>,
    /// Amount received at checkout; the rest becomes `remaining_cents`.
    pub amount_paid_cents: i64,
    /// Defaults to now.
    #[ts(as = "Option<String>")]
    pub sold_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl NewSale {
    /// Sum of `quantity × unit_price` over all items.
    pub fn total(&self) -> Money {
        self.items
            .iter()
            .map(|item| Money::from_cents(item.unit_price_cents).multiply_quantity(item.quantity))
            .sum()
    }

    /// Balance left after the amount paid at checkout, never negative.
    pub fn remaining(&self) -> Money {
        (self.total() - Money::from_cents(self.amount_paid_cents)).clamp_non_negative()
    }

    /// Fully paid sales are recorded as completed, the rest as pending.
    pub fn initial_status(&self) -> SaleStatus {
        if self.remaining().is_zero() {
            SaleStatus::Completed
        } else {
            SaleStatus::Pending
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.store_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "store_id".to_string(),
            }
            .into());
        }
        validate_payment_method(&self.payment_method)?;
        if self.items.is_empty() {
            return Err(CoreError::InvalidSale {
                reason: "a sale needs at least one item".to_string(),
            });
        }
        for item in &self.items {
            validate_quantity(item.quantity)?;
            validate_price_cents(item.unit_price_cents)?;
        }
        if self.amount_paid_cents < 0 {
            return Err(CoreError::InvalidSale {
                reason: "amount paid cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Commission Rate
// =============================================================================

/// Commission percentage for one payment method.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CommissionRate {
    pub tenant_id: String,
    pub payment_method: String,
    pub rate_bps: u32,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CommissionRate {
    #[inline]
    pub fn rate(&self) -> Percent {
        Percent::from_bps(self.rate_bps)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(cost: Option<i64>, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            sku: "SOF-001".to_string(),
            name: "Sofá 3 lugares".to_string(),
            category: Some("sofas".to_string()),
            cost_cents: cost,
            price_cents: 0,
            stock_quantity: stock,
            is_active: true,
            in_showroom: false,
            showroom_location: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_percent_from_percentage() {
        assert_eq!(Percent::from_percentage(45.0).bps(), 4500);
        assert_eq!(Percent::from_percentage(8.25).bps(), 825);
        assert_eq!(Percent::from_percentage(-3.0).bps(), 0);
        assert_eq!(Percent::from_percentage(f64::NAN).bps(), 0);
        assert_eq!(Percent::from_percentage(f64::INFINITY).bps(), 0);
    }

    #[test]
    fn test_stock_value() {
        assert_eq!(product(Some(50000), 3).stock_value().cents(), 150000);
        assert_eq!(product(None, 3).stock_value(), Money::zero());
        assert_eq!(product(Some(50000), -2).stock_value(), Money::zero());
    }

    #[test]
    fn test_new_sale_total() {
        let sale = NewSale {
            store_id: "loja-centro".to_string(),
            salesperson_id: None,
            payment_method: "pix".to_string(),
            items: vec![
                NewSaleItem {
                    product_id: "p1".to_string(),
                    name: "Cadeira".to_string(),
                    quantity: 4,
                    unit_price_cents: 35000,
                },
                NewSaleItem {
                    product_id: "p2".to_string(),
                    name: "Mesa".to_string(),
                    quantity: 1,
                    unit_price_cents: 120000,
                },
            ],
            amount_paid_cents: 0,
            sold_at: None,
        };
        assert_eq!(sale.total().cents(), 260000);
        assert_eq!(sale.remaining().cents(), 260000);
        assert_eq!(sale.initial_status(), SaleStatus::Pending);
        assert!(sale.validate().is_ok());
    }

    #[test]
    fn test_new_sale_validation() {
        let mut sale = NewSale {
            store_id: "loja-centro".to_string(),
            salesperson_id: None,
            payment_method: "pix".to_string(),
            items: Vec::new(),
            amount_paid_cents: 5000,
            sold_at: None,
        };
        assert!(matches!(sale.validate(), Err(CoreError::InvalidSale { .. })));

        sale.items.push(NewSaleItem {
            product_id: "p1".to_string(),
            name: "Banqueta".to_string(),
            quantity: 0,
            unit_price_cents: 5000,
        });
        assert!(matches!(sale.validate(), Err(CoreError::Validation(_))));

        sale.items[0].quantity = 1;
        assert!(sale.validate().is_ok());
        // Overpaid still settles at zero balance
        sale.amount_paid_cents = 9000;
        assert_eq!(sale.remaining(), Money::zero());
        assert_eq!(sale.initial_status(), SaleStatus::Completed);
    }

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Pending);
        assert_eq!(SaleStatus::Cancelled.to_string(), "cancelled");
    }
}
