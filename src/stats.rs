use crate::dates;
use crate::models::{PickupPoint, PurchaseRow};
use serde::Serialize;
use std::collections::BTreeMap;

/// Tolerance for comparing accumulated currency amounts.
pub(crate) const AMOUNT_EPSILON: f64 = 1e-6;

/// Per-order financial aggregate. `collected + pending + not_picked`
/// always equals `expected` within rounding tolerance: every purchase lands
/// in exactly one of the three buckets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderStats {
    pub collected: f64,
    /// Picked up but money not yet received.
    pub pending: f64,
    pub not_picked: f64,
    pub expected: f64,
    pub purchase_count: u32,
    pub pickup_totals: BTreeMap<PickupPoint, f64>,
    /// Collected amount per day-of-month, keyed by `collected_at`.
    pub daily_collected: BTreeMap<u32, f64>,
}

/// Folds flat purchase rows (already scoped to live, non-deleted rows) into
/// per-order aggregates. Orders with no purchases are absent from the map;
/// callers substitute `OrderStats::default()`.
pub fn build_order_stats(rows: &[PurchaseRow]) -> BTreeMap<String, OrderStats> {
    let mut by_order: BTreeMap<String, OrderStats> = BTreeMap::new();

    for row in rows {
        let amount = row.effective_amount();
        let stats = by_order.entry(row.order_id.clone()).or_default();
        stats.expected += amount;
        stats.purchase_count += 1;

        if !row.pickup_point.trim().is_empty() {
            *stats
                .pickup_totals
                .entry(PickupPoint::classify(&row.pickup_point))
                .or_insert(0.0) += amount;
        }

        // exactly one bucket per purchase, collected wins over picked up
        if row.collected {
            stats.collected += amount;
            if let Some(day) = row.collected_at.as_deref().and_then(dates::day_of_month) {
                *stats.daily_collected.entry(day).or_insert(0.0) += amount;
            }
        } else if row.picked_up {
            stats.pending += amount;
        } else {
            stats.not_picked += amount;
        }
    }

    by_order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(order_id: &str, price: f64) -> PurchaseRow {
        PurchaseRow {
            id: format!("p-{order_id}-{price}"),
            order_id: order_id.into(),
            customer_id: "c1".into(),
            customer_name: "Sara".into(),
            qty: 1,
            price,
            paid_price: None,
            bag_size: String::new(),
            pickup_point: String::new(),
            note: String::new(),
            picked_up: false,
            picked_up_at: None,
            collected: false,
            collected_at: None,
            created_at: "2026-03-01T10:00:00Z".into(),
        }
    }

    #[test]
    fn buckets_conserve_expected_total() {
        let mut collected = row("o1", 50.0);
        collected.collected = true;
        collected.picked_up = true;
        collected.collected_at = Some("2026-03-14T12:00:00Z".into());
        let mut pending = row("o1", 30.0);
        pending.picked_up = true;
        let not_picked = row("o1", 20.0);

        let stats = build_order_stats(&[collected, pending, not_picked]);
        let order = &stats["o1"];
        assert_eq!(order.expected, 100.0);
        assert_eq!(order.collected, 50.0);
        assert_eq!(order.pending, 30.0);
        assert_eq!(order.not_picked, 20.0);
        assert!(
            (order.collected + order.pending + order.not_picked - order.expected).abs()
                < AMOUNT_EPSILON
        );
        assert_eq!(order.purchase_count, 3);
        assert_eq!(order.daily_collected.get(&14), Some(&50.0));
    }

    #[test]
    fn paid_price_overrides_price_when_present() {
        let mut discounted = row("o1", 50.0);
        discounted.paid_price = Some(45.0);
        let stats = build_order_stats(&[discounted]);
        assert_eq!(stats["o1"].expected, 45.0);
    }

    #[test]
    fn collected_wins_over_picked_up() {
        let mut both = row("o1", 10.0);
        both.picked_up = true;
        both.collected = true;
        let stats = build_order_stats(&[both]);
        let order = &stats["o1"];
        assert_eq!(order.collected, 10.0);
        assert_eq!(order.pending, 0.0);
    }

    #[test]
    fn unparseable_collected_at_skips_daily_series_only() {
        let mut collected = row("o1", 25.0);
        collected.collected = true;
        collected.collected_at = Some("last tuesday".into());
        let stats = build_order_stats(&[collected]);
        let order = &stats["o1"];
        assert_eq!(order.collected, 25.0);
        assert!(order.daily_collected.is_empty());
    }

    #[test]
    fn empty_pickup_point_contributes_nothing() {
        let mut home = row("o1", 40.0);
        home.pickup_point = "توصيل".into();
        let blank = row("o1", 10.0);
        let stats = build_order_stats(&[home, blank]);
        let order = &stats["o1"];
        assert_eq!(order.pickup_totals.len(), 1);
        assert_eq!(order.pickup_totals.get(&PickupPoint::Delivery), Some(&40.0));
    }

    #[test]
    fn orders_without_purchases_are_absent() {
        let stats = build_order_stats(&[row("o1", 5.0)]);
        assert!(stats.contains_key("o1"));
        assert!(!stats.contains_key("o2"));
    }
}
