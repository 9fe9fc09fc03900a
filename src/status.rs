use crate::stats::AMOUNT_EPSILON;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusVariant {
    Neutral,
    Success,
    Danger,
    Warning,
}

/// Qualitative payment status plus the derived net figures the dashboards
/// show next to it.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStatus {
    pub variant: StatusVariant,
    pub label: &'static str,
    pub pending: f64,
    pub net_collected: f64,
    pub net_expected: f64,
    pub progress_pct: u32,
}

/// Total over every reachable input: an order (or month bucket) is either
/// empty, fully collected at a profit or a loss, or still collecting.
pub fn classify_order(expected: f64, collected: f64, spent: f64) -> OrderStatus {
    let pending = (expected - collected).max(0.0);
    let net_collected = collected - spent;
    let net_expected = expected - spent;
    let progress_pct = if expected > 0.0 {
        (100.0 * collected / expected).round() as u32
    } else {
        0
    };

    let (variant, label) = if expected == 0.0 {
        (StatusVariant::Neutral, "no purchases yet")
    } else if pending <= AMOUNT_EPSILON {
        if net_collected < 0.0 {
            (StatusVariant::Danger, "settled at a loss")
        } else {
            (StatusVariant::Success, "settled")
        }
    } else {
        (StatusVariant::Warning, "collection in progress")
    };

    OrderStatus {
        variant,
        label,
        pending,
        net_collected,
        net_expected,
        progress_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_order_is_neutral() {
        let status = classify_order(0.0, 0.0, 0.0);
        assert_eq!(status.variant, StatusVariant::Neutral);
        assert_eq!(status.label, "no purchases yet");
        assert_eq!(status.progress_pct, 0);
    }

    #[test]
    fn fully_collected_above_cost_is_settled() {
        let status = classify_order(100.0, 100.0, 80.0);
        assert_eq!(status.variant, StatusVariant::Success);
        assert_eq!(status.label, "settled");
        assert_eq!(status.pending, 0.0);
        assert_eq!(status.net_collected, 20.0);
        assert_eq!(status.progress_pct, 100);
    }

    #[test]
    fn fully_collected_below_cost_is_a_loss() {
        let status = classify_order(100.0, 100.0, 120.0);
        assert_eq!(status.variant, StatusVariant::Danger);
        assert_eq!(status.label, "settled at a loss");
        assert_eq!(status.net_collected, -20.0);
        assert_eq!(status.net_expected, -20.0);
    }

    #[test]
    fn partially_collected_is_in_progress() {
        let status = classify_order(100.0, 60.0, 0.0);
        assert_eq!(status.variant, StatusVariant::Warning);
        assert_eq!(status.label, "collection in progress");
        assert_eq!(status.pending, 40.0);
        assert_eq!(status.progress_pct, 60);
    }

    #[test]
    fn over_collection_clamps_pending_to_zero() {
        let status = classify_order(100.0, 110.0, 0.0);
        assert_eq!(status.pending, 0.0);
        assert_eq!(status.variant, StatusVariant::Success);
        assert_eq!(status.progress_pct, 110);
    }
}
