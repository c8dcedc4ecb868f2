//! # Manager Dashboard
//!
//! KPIs over a date range of sales. Cancelled sales only show up in the
//! cancelled count.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Sale, SaleStatus};

// =============================================================================
// Date Range
// =============================================================================

/// Longest span `last_n_days` will produce (ten years).
pub const MAX_RANGE_DAYS: u32 = 3660;

/// Inclusive range of calendar days, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range; swapped bounds are put back in order.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// The `days` days ending on `today` (today included). Zero is treated
    /// as one day and anything above [`MAX_RANGE_DAYS`] as that maximum.
    pub fn last_n_days(today: NaiveDate, days: u32) -> Self {
        let span = days.clamp(1, MAX_RANGE_DAYS) - 1;
        let start = today
            .checked_sub_days(Days::new(span as u64))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, today)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        day >= self.start && day <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Start of the first day, for storage queries.
    pub fn start_at(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Start of the day after the last one (exclusive upper bound).
    pub fn end_exclusive_at(&self) -> DateTime<Utc> {
        (self.end + Duration::days(1)).and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

// =============================================================================
// KPIs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesKpis {
    pub range: DateRange,
    /// Sum of effective (non-cancelled) sale totals.
    pub revenue: Money,
    pub effective_sales: usize,
    pub completed_sales: usize,
    pub pending_sales: usize,
    pub cancelled_sales: usize,
    /// Revenue / effective sales, rounded down. Zero with no sales.
    pub average_ticket: Money,
    /// Balances still to be received on effective sales.
    pub receivables: Money,
    pub commissions: Money,
}

impl SalesKpis {
    pub fn compute(sales: &[Sale], range: &DateRange) -> Self {
        let mut kpis = SalesKpis {
            range: *range,
            revenue: Money::zero(),
            effective_sales: 0,
            completed_sales: 0,
            pending_sales: 0,
            cancelled_sales: 0,
            average_ticket: Money::zero(),
            receivables: Money::zero(),
            commissions: Money::zero(),
        };

        for sale in sales.iter().filter(|s| range.contains(s.sold_at)) {
            match sale.status {
                SaleStatus::Cancelled => {
                    kpis.cancelled_sales += 1;
                    continue;
                }
                SaleStatus::Completed => kpis.completed_sales += 1,
                SaleStatus::Pending => kpis.pending_sales += 1,
            }
            kpis.effective_sales += 1;
            kpis.revenue += sale.total();
            kpis.receivables += sale.remaining().clamp_non_negative();
            kpis.commissions += sale.commission();
        }

        if kpis.effective_sales > 0 {
            kpis.average_ticket = Money::from_cents(kpis.revenue.cents() / kpis.effective_sales as i64);
        }
        kpis
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    #[ts(as = "String")]
    pub day: NaiveDate,
    pub revenue: Money,
    pub sales: usize,
}

/// One point per day of `range`, days without sales included at zero.
pub fn daily_revenue(sales: &[Sale], range: &DateRange) -> Vec<DailyRevenue> {
    let mut by_day: BTreeMap<NaiveDate, (Money, usize)> = BTreeMap::new();
    for sale in sales
        .iter()
        .filter(|s| s.is_effective() && range.contains(s.sold_at))
    {
        let slot = by_day.entry(sale.sold_at.date_naive()).or_default();
        slot.0 += sale.total();
        slot.1 += 1;
    }

    range
        .days()
        .map(|day| {
            let (revenue, count) = by_day.get(&day).copied().unwrap_or_default();
            DailyRevenue {
                day,
                revenue,
                sales: count,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StoreRevenue {
    pub store_id: String,
    pub revenue: Money,
    pub sales: usize,
}

/// Revenue per store, highest first.
pub fn revenue_by_store(sales: &[Sale], range: &DateRange) -> Vec<StoreRevenue> {
    let mut by_store: HashMap<&str, StoreRevenue> = HashMap::new();
    for sale in sales
        .iter()
        .filter(|s| s.is_effective() && range.contains(s.sold_at))
    {
        let row = by_store
            .entry(sale.store_id.as_str())
            .or_insert_with(|| StoreRevenue {
                store_id: sale.store_id.clone(),
                revenue: Money::zero(),
                sales: 0,
            });
        row.revenue += sale.total();
        row.sales += 1;
    }

    let mut rows: Vec<StoreRevenue> = by_store.into_values().collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.store_id.cmp(&b.store_id)));
    rows
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn sale(store: &str, d: u32, total: i64, remaining: i64, status: SaleStatus) -> Sale {
        let at = Utc.with_ymd_and_hms(2026, 10, d, 23, 59, 0).unwrap();
        Sale {
            id: format!("{}-{}-{}", store, d, total),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            store_id: store.to_string(),
            salesperson_id: None,
            payment_method: "pix".to_string(),
            status,
            total_cents: total,
            remaining_cents: remaining,
            commission_rate_bps: 200,
            commission_cents: total / 50,
            sold_at: at,
            created_at: at,
        }
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::new(day(10), day(12));
        assert_eq!(range.len_days(), 3);
        assert!(range.contains(Utc.with_ymd_and_hms(2026, 10, 12, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2026, 10, 13, 0, 0, 0).unwrap()));
        assert_eq!(range.end_exclusive_at(), Utc.with_ymd_and_hms(2026, 10, 13, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_last_n_days() {
        let range = DateRange::last_n_days(day(19), 7);
        assert_eq!(range.start, day(13));
        assert_eq!(range.end, day(19));
        assert_eq!(DateRange::last_n_days(day(19), 0).len_days(), 1);
    }

    #[test]
    fn test_last_n_days_is_capped() {
        let range = DateRange::last_n_days(day(19), u32::MAX);
        assert_eq!(range.end, day(19));
        assert_eq!(range.len_days(), MAX_RANGE_DAYS as i64);

        let early = NaiveDate::MIN + Duration::days(3);
        assert_eq!(DateRange::last_n_days(early, 30).start, NaiveDate::MIN);
    }

    #[test]
    fn test_kpis() {
        let range = DateRange::new(day(1), day(10));
        let sales = vec![
            sale("centro", 1, 100000, 0, SaleStatus::Completed),
            sale("centro", 2, 50000, 30000, SaleStatus::Pending),
            sale("shopping", 3, 999999, 0, SaleStatus::Cancelled),
            sale("shopping", 20, 10000, 0, SaleStatus::Completed),
        ];

        let kpis = SalesKpis::compute(&sales, &range);
        assert_eq!(kpis.revenue.cents(), 150000);
        assert_eq!(kpis.effective_sales, 2);
        assert_eq!(kpis.completed_sales, 1);
        assert_eq!(kpis.pending_sales, 1);
        assert_eq!(kpis.cancelled_sales, 1);
        assert_eq!(kpis.average_ticket.cents(), 75000);
        assert_eq!(kpis.receivables.cents(), 30000);
        assert_eq!(kpis.commissions.cents(), 3000);
    }

    #[test]
    fn test_kpis_empty_range() {
        let kpis = SalesKpis::compute(&[], &DateRange::new(day(1), day(1)));
        assert_eq!(kpis.average_ticket, Money::zero());
    }

    #[test]
    fn test_daily_revenue_zero_fills() {
        let range = DateRange::new(day(1), day(4));
        let sales = vec![
            sale("centro", 1, 100, 0, SaleStatus::Completed),
            sale("centro", 1, 200, 0, SaleStatus::Completed),
            sale("centro", 3, 50, 0, SaleStatus::Pending),
            sale("centro", 4, 70, 0, SaleStatus::Cancelled),
        ];

        let points = daily_revenue(&sales, &range);
        let values: Vec<i64> = points.iter().map(|p| p.revenue.cents()).collect();
        assert_eq!(values, vec![300, 0, 50, 0]);
        assert_eq!(points[0].sales, 2);
    }

    #[test]
    fn test_revenue_by_store_sorted() {
        let range = DateRange::new(day(1), day(30));
        let sales = vec![
            sale("centro", 1, 100, 0, SaleStatus::Completed),
            sale("shopping", 2, 500, 0, SaleStatus::Completed),
            sale("centro", 3, 100, 0, SaleStatus::Completed),
        ];
        let rows = revenue_by_store(&sales, &range);
        assert_eq!(rows[0].store_id, "shopping");
        assert_eq!(rows[1].store_id, "centro");
        assert_eq!(rows[1].sales, 2);
    }
}
