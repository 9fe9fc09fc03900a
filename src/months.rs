use crate::dates;
use crate::models::{OrderRow, PickupPoint};
use crate::stats::{AMOUNT_EPSILON, OrderStats};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Calendar-month rollup of order aggregates, keyed `YYYY-MM`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonthBucket {
    pub collected: f64,
    pub expected: f64,
    pub spent: f64,
    pub purchase_count: u32,
    pub order_count: u32,
    pub pickup_totals: BTreeMap<PickupPoint, f64>,
    pub daily_collected: BTreeMap<u32, f64>,
    pub daily_spent: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonthlyOverview {
    pub months: BTreeMap<String, MonthBucket>,
    /// Sorted distinct years present, for year paging. Derived index only.
    pub years: Vec<i32>,
}

/// Folds per-order aggregates into month buckets. An order buckets by
/// `order_date` when parseable, else `created_at`; an order with neither is
/// skipped, never guessed into a bucket.
pub fn aggregate_months(
    orders: &[OrderRow],
    stats: &BTreeMap<String, OrderStats>,
) -> MonthlyOverview {
    let mut overview = MonthlyOverview::default();
    let mut years: BTreeSet<i32> = BTreeSet::new();
    let empty = OrderStats::default();

    for order in orders {
        let Some(date) = bucketing_date(order) else {
            warn!(order = %order.id, "order has no parseable date, skipped in month rollup");
            continue;
        };
        years.insert(date.year());

        let bucket = overview.months.entry(dates::month_key(date)).or_default();
        let order_stats = stats.get(&order.id).unwrap_or(&empty);

        bucket.collected += order_stats.collected;
        bucket.expected += order_stats.expected;
        bucket.spent += order.spent_amount;
        bucket.purchase_count += order_stats.purchase_count;
        bucket.order_count += 1;

        for (point, amount) in &order_stats.pickup_totals {
            *bucket.pickup_totals.entry(*point).or_insert(0.0) += amount;
        }

        let mut dated = 0.0;
        for (day, amount) in &order_stats.daily_collected {
            *bucket.daily_collected.entry(*day).or_insert(0.0) += amount;
            dated += amount;
        }
        // Collected money without a dated collection event still has to
        // land somewhere in the series; attribute the shortfall to the
        // order's own day.
        let shortfall = order_stats.collected - dated;
        if shortfall > AMOUNT_EPSILON {
            *bucket.daily_collected.entry(date.day()).or_insert(0.0) += shortfall;
        }

        // spent amounts have no finer-grained daily record
        if order.spent_amount > 0.0 {
            *bucket.daily_spent.entry(date.day()).or_insert(0.0) += order.spent_amount;
        }
    }

    overview.years = years.into_iter().collect();
    overview
}

fn bucketing_date(order: &OrderRow) -> Option<NaiveDate> {
    order
        .order_date
        .as_deref()
        .and_then(dates::parse_date)
        .or_else(|| dates::parse_date(&order.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, order_date: Option<&str>, created_at: &str, spent: f64) -> OrderRow {
        OrderRow {
            id: id.into(),
            order_name: format!("order {id}"),
            order_date: order_date.map(Into::into),
            created_at: created_at.into(),
            arrived: false,
            placed_at_pickup: false,
            placed_at_pickup_at: None,
            spent_amount: spent,
        }
    }

    fn stats_for(collected: f64, expected: f64, daily: &[(u32, f64)]) -> OrderStats {
        OrderStats {
            collected,
            expected,
            pending: expected - collected,
            purchase_count: 1,
            daily_collected: daily.iter().copied().collect(),
            ..OrderStats::default()
        }
    }

    #[test]
    fn order_date_wins_over_created_at() {
        let orders = vec![order(
            "o1",
            Some("2026-02-20"),
            "2026-03-01T08:00:00Z",
            0.0,
        )];
        let stats = BTreeMap::from([("o1".to_string(), stats_for(0.0, 10.0, &[]))]);
        let overview = aggregate_months(&orders, &stats);
        assert!(overview.months.contains_key("2026-02"));
        assert!(!overview.months.contains_key("2026-03"));
    }

    #[test]
    fn fallback_day_keeps_daily_series_complete() {
        // 30 of the 80 collected has no dated collection event
        let orders = vec![order("o1", Some("2026-03-05"), "2026-03-05T08:00:00Z", 0.0)];
        let stats = BTreeMap::from([(
            "o1".to_string(),
            stats_for(80.0, 100.0, &[(14, 50.0)]),
        )]);
        let overview = aggregate_months(&orders, &stats);
        let bucket = &overview.months["2026-03"];

        let daily_sum: f64 = bucket.daily_collected.values().sum();
        assert!((daily_sum - bucket.collected).abs() < AMOUNT_EPSILON);
        assert_eq!(bucket.daily_collected.get(&14), Some(&50.0));
        assert_eq!(bucket.daily_collected.get(&5), Some(&30.0));
    }

    #[test]
    fn fully_dated_collection_adds_no_fallback_entry() {
        let orders = vec![order("o1", Some("2026-03-05"), "2026-03-05T08:00:00Z", 0.0)];
        let stats = BTreeMap::from([(
            "o1".to_string(),
            stats_for(50.0, 50.0, &[(14, 50.0)]),
        )]);
        let overview = aggregate_months(&orders, &stats);
        let bucket = &overview.months["2026-03"];
        assert_eq!(bucket.daily_collected.len(), 1);
        assert_eq!(bucket.daily_collected.get(&14), Some(&50.0));
    }

    #[test]
    fn spent_lands_on_the_bucketing_day() {
        let orders = vec![
            order("o1", Some("2026-03-05"), "2026-03-05T08:00:00Z", 120.0),
            order("o2", Some("2026-03-05"), "2026-03-05T08:00:00Z", 30.0),
            order("o3", Some("2026-03-09"), "2026-03-09T08:00:00Z", 0.0),
        ];
        let stats = BTreeMap::new();
        let overview = aggregate_months(&orders, &stats);
        let bucket = &overview.months["2026-03"];
        assert_eq!(bucket.spent, 150.0);
        assert_eq!(bucket.daily_spent.get(&5), Some(&150.0));
        assert_eq!(bucket.daily_spent.get(&9), None);
        assert_eq!(bucket.order_count, 3);
    }

    #[test]
    fn merges_pickup_totals_across_orders() {
        let orders = vec![
            order("o1", Some("2026-03-05"), "2026-03-05T08:00:00Z", 0.0),
            order("o2", Some("2026-03-20"), "2026-03-20T08:00:00Z", 0.0),
        ];
        let mut first = stats_for(10.0, 10.0, &[]);
        first
            .pickup_totals
            .insert(PickupPoint::Delivery, 10.0);
        let mut second = stats_for(5.0, 5.0, &[]);
        second.pickup_totals.insert(PickupPoint::Delivery, 5.0);
        second.pickup_totals.insert(PickupPoint::Home, 3.0);
        let stats = BTreeMap::from([("o1".to_string(), first), ("o2".to_string(), second)]);

        let overview = aggregate_months(&orders, &stats);
        let bucket = &overview.months["2026-03"];
        assert_eq!(bucket.pickup_totals.get(&PickupPoint::Delivery), Some(&15.0));
        assert_eq!(bucket.pickup_totals.get(&PickupPoint::Home), Some(&3.0));
    }

    #[test]
    fn years_index_is_sorted_and_distinct() {
        let orders = vec![
            order("o1", Some("2027-01-05"), "2027-01-05T08:00:00Z", 0.0),
            order("o2", Some("2026-03-20"), "2026-03-20T08:00:00Z", 0.0),
            order("o3", Some("2026-11-02"), "2026-11-02T08:00:00Z", 0.0),
        ];
        let overview = aggregate_months(&orders, &BTreeMap::new());
        assert_eq!(overview.years, vec![2026, 2027]);
    }

    #[test]
    fn unbucketable_orders_are_skipped() {
        let orders = vec![order("o1", Some("???"), "also garbage", 10.0)];
        let overview = aggregate_months(&orders, &BTreeMap::new());
        assert!(overview.months.is_empty());
        assert!(overview.years.is_empty());
    }
}
