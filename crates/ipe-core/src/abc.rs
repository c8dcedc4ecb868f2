//! # Curva ABC
//!
//! Pareto classification of products by revenue.
//!
//! ## Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Aggregate line items per product (effective sales only)             │
//! │  2. Stable sort by revenue, descending (ties keep first-seen order)     │
//! │  3. Walk the list accumulating revenue                                  │
//! │                                                                         │
//! │     cumulative ≤ 80% of total ──► A                                     │
//! │     cumulative ≤ 95% of total ──► B                                     │
//! │     otherwise               ──► C                                       │
//! │                                                                         │
//! │  Comparisons are exact: cumulative × 100 ≤ total × 80                   │
//! │                                                                         │
//! │  Zero total revenue: every product is C, cumulative 0%                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Sale, SaleItem};
use crate::{ABC_CLASS_A_LIMIT_PCT, ABC_CLASS_B_LIMIT_PCT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl std::fmt::Display for AbcClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbcClass::A => write!(f, "A"),
            AbcClass::B => write!(f, "B"),
            AbcClass::C => write!(f, "C"),
        }
    }
}

/// Revenue of one product over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevenueEntry {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEntry {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
    /// This product's share of total revenue, 0-100.
    pub share_pct: f64,
    /// Running share including this product, 0-100.
    pub cumulative_pct: f64,
    pub class: AbcClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub class: AbcClass,
    pub products: usize,
    pub revenue: Money,
    pub revenue_share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AbcReport {
    pub entries: Vec<ClassifiedEntry>,
    pub total_revenue: Money,
    /// Always three rows, A then B then C.
    pub summary: Vec<ClassSummary>,
}

impl AbcReport {
    pub fn count(&self, class: AbcClass) -> usize {
        self.entries.iter().filter(|e| e.class == class).count()
    }
}

/// Aggregates line items into per-product revenue.
///
/// Items whose sale is cancelled, or not in `sales` at all, are ignored.
/// Output keeps the order in which products were first seen, which is the
/// tie-break order of [`classify`].
pub fn revenue_by_product(sales: &[Sale], items: &[SaleItem]) -> Vec<RevenueEntry> {
    let effective: HashSet<&str> = sales
        .iter()
        .filter(|s| s.is_effective())
        .map(|s| s.id.as_str())
        .collect();

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<RevenueEntry> = Vec::new();

    for item in items.iter().filter(|i| effective.contains(i.sale_id.as_str())) {
        let slot = *index.entry(item.product_id.as_str()).or_insert_with(|| {
            entries.push(RevenueEntry {
                product_id: item.product_id.clone(),
                name: item.name_snapshot.clone(),
                quantity: 0,
                revenue: Money::zero(),
            });
            entries.len() - 1
        });

        entries[slot].quantity += item.quantity;
        entries[slot].revenue += item.line_total();
    }

    entries
}

/// Classifies products into A/B/C tiers.
pub fn classify(mut entries: Vec<RevenueEntry>) -> AbcReport {
    // sort_by is stable: equal revenue keeps input order
    entries.sort_by(|a, b| b.revenue.cmp(&a.revenue));

    let total: i128 = entries.iter().map(|e| e.revenue.cents().max(0) as i128).sum();
    let mut cumulative: i128 = 0;
    let mut classified = Vec::with_capacity(entries.len());

    for entry in entries {
        let revenue = entry.revenue.cents().max(0) as i128;
        cumulative += revenue;

        let (class, share_pct, cumulative_pct) = if total == 0 {
            (AbcClass::C, 0.0, 0.0)
        } else {
            let class = if cumulative * 100 <= total * ABC_CLASS_A_LIMIT_PCT as i128 {
                AbcClass::A
            } else if cumulative * 100 <= total * ABC_CLASS_B_LIMIT_PCT as i128 {
                AbcClass::B
            } else {
                AbcClass::C
            };
            (
                class,
                revenue as f64 * 100.0 / total as f64,
                cumulative as f64 * 100.0 / total as f64,
            )
        };

        classified.push(ClassifiedEntry {
            product_id: entry.product_id,
            name: entry.name,
            quantity: entry.quantity,
            revenue: entry.revenue,
            share_pct,
            cumulative_pct,
            class,
        });
    }

    let summary = [AbcClass::A, AbcClass::B, AbcClass::C]
        .into_iter()
        .map(|class| {
            let in_class = classified.iter().filter(|e| e.class == class);
            let revenue: Money = in_class.clone().map(|e| e.revenue).sum();
            ClassSummary {
                class,
                products: in_class.count(),
                revenue,
                revenue_share_pct: if total == 0 {
                    0.0
                } else {
                    revenue.cents().max(0) as f64 * 100.0 / total as f64
                },
            }
        })
        .collect();

    AbcReport {
        entries: classified,
        total_revenue: Money::from_cents(total as i64),
        summary,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleStatus;
    use chrono::Utc;

    fn entry(id: &str, revenue: i64) -> RevenueEntry {
        RevenueEntry {
            product_id: id.to_string(),
            name: id.to_uppercase(),
            quantity: 1,
            revenue: Money::from_cents(revenue),
        }
    }

    fn sale(id: &str, status: SaleStatus) -> Sale {
        let now = Utc::now();
        Sale {
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
            sold_at: now,
            created_at: now,
        }
    }

    fn item(sale_id: &str, product_id: &str, qty: i64, unit: i64) -> SaleItem {
        SaleItem {
            id: format!("{}-{}", sale_id, product_id),
            sale_id: sale_id.to_string(),
            product_id: product_id.to_string(),
            name_snapshot: product_id.to_uppercase(),
            quantity: qty,
            unit_price_cents: unit,
            line_total_cents: qty * unit,
        }
    }

    #[test]
    fn test_pareto_tiers() {
        // total 1000: 700 (70%) A, 100 (80%) A, 100 (90%) B, 50 (95%) B, 50 (100%) C
        let report = classify(vec![
            entry("e", 50),
            entry("a", 700),
            entry("c", 100),
            entry("b", 100),
            entry("d", 50),
        ]);

        let classes: Vec<(&str, AbcClass)> = report
            .entries
            .iter()
            .map(|e| (e.product_id.as_str(), e.class))
            .collect();
        assert_eq!(
            classes,
            vec![
                ("a", AbcClass::A),
                ("c", AbcClass::A),
                ("b", AbcClass::B),
                ("e", AbcClass::B),
                ("d", AbcClass::C),
            ]
        );
        assert_eq!(report.total_revenue.cents(), 1000);
    }

    #[test]
    fn test_counts_sum_and_last_cumulative_is_100() {
        let entries: Vec<RevenueEntry> = (1..=37)
            .map(|i| entry(&format!("p{}", i), (i * 7919 % 1000) as i64 + 1))
            .collect();
        let report = classify(entries);

        let total = report.count(AbcClass::A) + report.count(AbcClass::B) + report.count(AbcClass::C);
        assert_eq!(total, 37);
        assert_eq!(report.entries.last().map(|e| e.cumulative_pct), Some(100.0));

        let summary_total: usize = report.summary.iter().map(|s| s.products).sum();
        assert_eq!(summary_total, 37);
    }

    #[test]
    fn test_zero_revenue_is_all_class_c() {
        let report = classify(vec![entry("a", 0), entry("b", 0)]);
        assert!(report.entries.iter().all(|e| e.class == AbcClass::C));
        assert!(report.entries.iter().all(|e| e.cumulative_pct == 0.0));
        assert_eq!(report.count(AbcClass::C), 2);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let report = classify(vec![entry("first", 100), entry("second", 100), entry("third", 100)]);
        let order: Vec<&str> = report.entries.iter().map(|e| e.product_id.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_input() {
        let report = classify(Vec::new());
        assert!(report.entries.is_empty());
        assert_eq!(report.summary.len(), 3);
    }

    #[test]
    fn test_revenue_by_product_ignores_cancelled() {
        let sales = vec![sale("s1", SaleStatus::Completed), sale("s2", SaleStatus::Cancelled), sale("s3", SaleStatus::Pending)];
        let items = vec![
            item("s1", "sofa", 1, 300000),
            item("s2", "sofa", 5, 300000),
            item("s3", "mesa", 2, 80000),
            item("s3", "sofa", 1, 290000),
            item("unknown", "mesa", 9, 1),
        ];

        let entries = revenue_by_product(&sales, &items);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].product_id, "sofa");
        assert_eq!(entries[0].quantity, 2);
        assert_eq!(entries[0].revenue.cents(), 590000);
        assert_eq!(entries[1].product_id, "mesa");
        assert_eq!(entries[1].revenue.cents(), 160000);
    }
}
