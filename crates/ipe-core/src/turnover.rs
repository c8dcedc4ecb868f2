//! # Stock Turnover (Giro de Estoque)
//!
//! Flags products that have not sold for more than a threshold of days
//! ("encalhados") and values that stale inventory at cost.
//!
//! ## Rules
//! ```text
//! last sale ─────────► days_since_last_sale = today - last_sale_date
//!
//!   never sold         → None        → stale, whatever the threshold
//!   days > threshold   → Some(days)  → stale
//!   days ≤ threshold   → Some(days)  → fresh
//! ```
//!
//! "Never sold" is an explicit `None`; there is no sentinel day count.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Product, Sale, SaleItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TurnoverEntry {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub stock_quantity: i64,
    pub stock_value: Money,
    #[ts(as = "Option<String>")]
    pub last_sold: Option<NaiveDate>,
    pub days_since_last_sale: Option<i64>,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StaleInventoryReport {
    #[ts(as = "String")]
    pub reference_date: NaiveDate,
    pub threshold_days: i64,
    /// Active products, stale first, then by days without sale descending.
    pub entries: Vec<TurnoverEntry>,
    pub stale_count: usize,
    pub stale_value: Money,
    pub never_sold_count: usize,
}

impl StaleInventoryReport {
    pub fn stale(&self) -> impl Iterator<Item = &TurnoverEntry> {
        self.entries.iter().filter(|e| e.stale)
    }
}

/// Whole days between the last sale and `today`. A sale dated after `today`
/// counts as zero days.
pub fn days_since(last_sale: Option<DateTime<Utc>>, today: NaiveDate) -> Option<i64> {
    last_sale.map(|at| (today - at.date_naive()).num_days().max(0))
}

/// Stale iff never sold or unsold for more than `threshold_days`.
pub fn is_stale(days_since_last_sale: Option<i64>, threshold_days: i64) -> bool {
    match days_since_last_sale {
        None => true,
        Some(days) => days > threshold_days.max(0),
    }
}

/// Latest effective sale date per product.
pub fn last_sale_by_product(sales: &[Sale], items: &[SaleItem]) -> HashMap<String, DateTime<Utc>> {
    let sold_at: HashMap<&str, DateTime<Utc>> = sales
        .iter()
        .filter(|s| s.is_effective())
        .map(|s| (s.id.as_str(), s.sold_at))
        .collect();

    let mut last: HashMap<String, DateTime<Utc>> = HashMap::new();
    for item in items {
        let Some(&at) = sold_at.get(item.sale_id.as_str()) else {
            continue;
        };
        last.entry(item.product_id.clone())
            .and_modify(|current| {
                if at > *current {
                    *current = at;
                }
            })
            .or_insert(at);
    }
    last
}

/// Builds the stale inventory report for the active catalog.
///
/// ## Example
/// ```rust
/// use std::collections::HashMap;
/// use chrono::NaiveDate;
/// use ipe_core::turnover::analyze;
///
/// let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
/// let report = analyze(&[], &HashMap::new(), today, 30);
/// assert_eq!(report.stale_count, 0);
/// ```
pub fn analyze(
    products: &[Product],
    last_sales: &HashMap<String, DateTime<Utc>>,
    today: NaiveDate,
    threshold_days: i64,
) -> StaleInventoryReport {
    let mut entries: Vec<TurnoverEntry> = products
        .iter()
        .filter(|p| p.is_active)
        .map(|product| {
            let last = last_sales.get(&product.id).copied();
            let days = days_since(last, today);
            TurnoverEntry {
                product_id: product.id.clone(),
                sku: product.sku.clone(),
                name: product.name.clone(),
                stock_quantity: product.stock_quantity,
                stock_value: product.stock_value(),
                last_sold: last.map(|at| at.date_naive()),
                days_since_last_sale: days,
                stale: is_stale(days, threshold_days),
            }
        })
        .collect();

    // Stale first; within a group, never-sold first, then oldest sale first
    entries.sort_by(|a, b| {
        b.stale.cmp(&a.stale).then_with(|| {
            let a_days = a.days_since_last_sale.unwrap_or(i64::MAX);
            let b_days = b.days_since_last_sale.unwrap_or(i64::MAX);
            b_days.cmp(&a_days)
        })
    });

    let stale_count = entries.iter().filter(|e| e.stale).count();
    let stale_value = entries.iter().filter(|e| e.stale).map(|e| e.stock_value).sum();
    let never_sold_count = entries.iter().filter(|e| e.last_sold.is_none()).count();

    StaleInventoryReport {
        reference_date: today,
        threshold_days: threshold_days.max(0),
        entries,
        stale_count,
        stale_value,
        never_sold_count,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleStatus;
    use chrono::{Duration, TimeZone};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn at(days_ago: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&today().and_hms_opt(15, 30, 0).unwrap()) - Duration::days(days_ago)
    }

    fn product(id: &str, cost: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            sku: id.to_uppercase(),
            name: id.to_string(),
            category: Some("sofas".to_string()),
            cost_cents: Some(cost),
            price_cents: cost * 2,
            stock_quantity: stock,
            is_active: true,
            in_showroom: false,
            showroom_location: None,
            created_at: at(400),
            updated_at: at(400),
        }
    }

    #[test]
    fn test_sold_today_is_never_stale() {
        assert_eq!(days_since(Some(at(0)), today()), Some(0));
        assert!(!is_stale(Some(0), 30));
        assert!(!is_stale(Some(0), 0));
    }

    #[test]
    fn test_never_sold_is_always_stale() {
        for threshold in [0, 30, 365, 100_000] {
            assert!(is_stale(None, threshold));
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(!is_stale(Some(30), 30));
        assert!(is_stale(Some(31), 30));
    }

    #[test]
    fn test_future_sale_counts_as_zero_days() {
        assert_eq!(days_since(Some(at(-3)), today()), Some(0));
    }

    #[test]
    fn test_analyze_values_stale_inventory() {
        let mut inactive = product("inativo", 1000, 10);
        inactive.is_active = false;

        let products = vec![
            product("recente", 10000, 2),
            product("antigo", 20000, 3),
            product("nunca", 5000, 4),
            inactive,
        ];
        let mut last = HashMap::new();
        last.insert("recente".to_string(), at(5));
        last.insert("antigo".to_string(), at(120));

        let report = analyze(&products, &last, today(), 90);

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.stale_count, 2);
        assert_eq!(report.never_sold_count, 1);
        // 3 × 200,00 + 4 × 50,00
        assert_eq!(report.stale_value.cents(), 60000 + 20000);

        let order: Vec<&str> = report.entries.iter().map(|e| e.product_id.as_str()).collect();
        assert_eq!(order, vec!["nunca", "antigo", "recente"]);
        assert_eq!(report.entries[1].days_since_last_sale, Some(120));
        assert_eq!(report.entries[0].days_since_last_sale, None);
    }

    #[test]
    fn test_last_sale_by_product_uses_latest_effective_sale() {
        let sale = |id: &str, days_ago: i64, status: SaleStatus| Sale {
            id: id.to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            store_id: "loja".to_string(),
            salesperson_id: None,
            payment_method: "pix".to_string(),
            status,
            total_cents: 0,
            remaining_cents: 0,
            commission_rate_bps: 0,
            commission_cents: 0,
            sold_at: at(days_ago),
            created_at: at(days_ago),
        };
        let item = |sale_id: &str, product_id: &str| SaleItem {
            id: format!("{}-{}", sale_id, product_id),
            sale_id: sale_id.to_string(),
            product_id: product_id.to_string(),
            name_snapshot: product_id.to_string(),
            quantity: 1,
            unit_price_cents: 100,
            line_total_cents: 100,
        };

        let sales = vec![
            sale("old", 50, SaleStatus::Completed),
            sale("new", 10, SaleStatus::Completed),
            sale("cancelled", 1, SaleStatus::Cancelled),
        ];
        let items = vec![item("old", "sofa"), item("new", "sofa"), item("cancelled", "sofa"), item("old", "mesa")];

        let last = last_sale_by_product(&sales, &items);
        assert_eq!(last.get("sofa"), Some(&at(10)));
        assert_eq!(last.get("mesa"), Some(&at(50)));
    }
}
