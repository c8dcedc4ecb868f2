//! # Commission
//!
//! Commission rates are configured per payment method. When a sale is
//! recorded, the rate in force is copied onto the sale together with the
//! amount it yields. Reports only ever sum those stored snapshots.
//!
//! ```text
//! commission_rates (mutable)          sales (snapshot, never rewritten)
//! ┌──────────────┬──────┐             ┌────────┬───────────┬────────────┐
//! │ pix          │ 3%   │──record──►  │ total  │ rate_bps  │ commission │
//! │ credito      │ 2%   │   sale      │ 1000,00│ 300       │ 30,00      │
//! │ crediario    │ 4%   │             └────────┴───────────┴────────────┘
//! └──────────────┴──────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::dashboard::DateRange;
use crate::money::Money;
use crate::types::{CommissionRate, Percent, Sale};

/// Payment method → commission rate lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTable {
    rates: BTreeMap<String, Percent>,
}

impl CommissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rates(rates: &[CommissionRate]) -> Self {
        let mut table = Self::new();
        for rate in rates {
            table.set(&rate.payment_method, rate.rate());
        }
        table
    }

    pub fn set(&mut self, payment_method: &str, rate: Percent) {
        self.rates.insert(normalize_method(payment_method), rate);
    }

    /// Unknown methods earn nothing.
    pub fn rate_for(&self, payment_method: &str) -> Percent {
        self.rates
            .get(&normalize_method(payment_method))
            .copied()
            .unwrap_or_default()
    }

    pub fn snapshot(&self, total: Money, payment_method: &str) -> CommissionSnapshot {
        CommissionSnapshot::new(total, self.rate_for(payment_method))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Payment method keys are stored trimmed and lowercase.
pub fn normalize_method(payment_method: &str) -> String {
    payment_method.trim().to_lowercase()
}

/// Rate and amount frozen onto a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSnapshot {
    pub rate_bps: u32,
    pub amount: Money,
}

impl CommissionSnapshot {
    pub fn new(total: Money, rate: Percent) -> Self {
        Self {
            rate_bps: rate.bps(),
            amount: total.clamp_non_negative().percentage(rate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalespersonCommission {
    pub salesperson_id: String,
    pub sales: usize,
    pub revenue: Money,
    pub commission: Money,
}

/// Sums stored commission per salesperson for effective sales in `range`.
///
/// Sales without a salesperson are left out. Sorted by commission
/// descending, then by salesperson id.
pub fn commission_by_salesperson(sales: &[Sale], range: &DateRange) -> Vec<SalespersonCommission> {
    let mut totals: BTreeMap<&str, SalespersonCommission> = BTreeMap::new();

    for sale in sales
        .iter()
        .filter(|s| s.is_effective() && range.contains(s.sold_at))
    {
        let Some(person) = sale.salesperson_id.as_deref() else {
            continue;
        };
        let row = totals.entry(person).or_insert_with(|| SalespersonCommission {
            salesperson_id: person.to_string(),
            sales: 0,
            revenue: Money::zero(),
            commission: Money::zero(),
        });
        row.sales += 1;
        row.revenue += sale.total();
        row.commission += sale.commission();
    }

    let mut rows: Vec<SalespersonCommission> = totals.into_values().collect();
    rows.sort_by(|a, b| {
        b.commission
            .cmp(&a.commission)
            .then_with(|| a.salesperson_id.cmp(&b.salesperson_id))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleStatus;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sale(person: Option<&str>, day: u32, total: i64, commission: i64, status: SaleStatus) -> Sale {
        let at = Utc.with_ymd_and_hms(2026, 9, day, 14, 0, 0).unwrap();
        Sale {
            id: format!("s-{}-{}", day, total),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            store_id: "loja".to_string(),
            salesperson_id: person.map(str::to_string),
            payment_method: "pix".to_string(),
            status,
            total_cents: total,
            remaining_cents: 0,
            commission_rate_bps: 300,
            commission_cents: commission,
            sold_at: at,
            created_at: at,
        }
    }

    #[test]
    fn test_unknown_method_earns_zero() {
        let mut table = CommissionTable::new();
        table.set("PIX ", Percent::from_bps(300));

        assert_eq!(table.rate_for("pix").bps(), 300);
        assert_eq!(table.rate_for("boleto"), Percent::zero());
        assert_eq!(table.snapshot(Money::from_cents(100000), "boleto").amount, Money::zero());
    }

    #[test]
    fn test_snapshot_rounds_half_up() {
        let table = {
            let mut t = CommissionTable::new();
            t.set("credito", Percent::from_bps(250));
            t
        };
        // 2.5% of 10,10 = 0,2525
        let snap = table.snapshot(Money::from_cents(1010), "credito");
        assert_eq!(snap.rate_bps, 250);
        assert_eq!(snap.amount.cents(), 25);

        // 2.5% of 0,30 = 0,0075 → 0,01
        assert_eq!(table.snapshot(Money::from_cents(30), "credito").amount.cents(), 1);
    }

    #[test]
    fn test_by_salesperson_sums_stored_snapshots() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
        );
        let sales = vec![
            sale(Some("ana"), 2, 100000, 3000, SaleStatus::Completed),
            // Stored snapshot wins even if today's rate would give more
            sale(Some("ana"), 3, 50000, 1000, SaleStatus::Pending),
            sale(Some("bruno"), 4, 200000, 8000, SaleStatus::Completed),
            sale(Some("bruno"), 5, 900000, 27000, SaleStatus::Cancelled),
            sale(None, 6, 70000, 2100, SaleStatus::Completed),
        ];

        let rows = commission_by_salesperson(&sales, &range);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].salesperson_id, "bruno");
        assert_eq!(rows[0].commission.cents(), 8000);
        assert_eq!(rows[1].salesperson_id, "ana");
        assert_eq!(rows[1].sales, 2);
        assert_eq!(rows[1].revenue.cents(), 150000);
        assert_eq!(rows[1].commission.cents(), 4000);
    }
}
