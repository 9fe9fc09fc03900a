use crate::errors::LedgerError;
use serde::{Deserialize, Serialize};

/// A purchase row as the record store persists it. Timestamps stay strings
/// here; they are parsed leniently at aggregation time (`dates::parse_date`)
/// because stored rows may carry missing or ambiguous values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRow {
    pub id: String,
    pub order_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub qty: u32,
    pub price: f64,
    #[serde(default)]
    pub paid_price: Option<f64>,
    #[serde(default)]
    pub bag_size: String,
    #[serde(default)]
    pub pickup_point: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub picked_up: bool,
    #[serde(default)]
    pub picked_up_at: Option<String>,
    #[serde(default)]
    pub collected: bool,
    #[serde(default)]
    pub collected_at: Option<String>,
    pub created_at: String,
}

impl PurchaseRow {
    /// Amount the purchase contributes to totals: the recorded paid price
    /// when present, the agreed sale price otherwise.
    pub fn effective_amount(&self) -> f64 {
        self.paid_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: String,
    pub order_name: String,
    /// Authoritative over `created_at` for calendar bucketing when present
    /// and parseable.
    #[serde(default)]
    pub order_date: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub arrived: bool,
    #[serde(default)]
    pub placed_at_pickup: bool,
    #[serde(default)]
    pub placed_at_pickup_at: Option<String>,
    #[serde(default)]
    pub spent_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRow {
    pub purchase_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRow {
    pub id: String,
    pub purchase_id: String,
    pub storage_path: String,
}

/// Image identity pair carried in delete snapshots and removal requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub storage_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseImage {
    pub id: String,
    pub storage_path: String,
    pub public_url: String,
}

/// A purchase joined with its dependent records, as reads and writes return
/// it to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    #[serde(flatten)]
    pub row: PurchaseRow,
    pub links: Vec<String>,
    pub images: Vec<PurchaseImage>,
}

/// Fields for creating a purchase. Pickup/collection state always starts
/// cleared; ids and `created_at` are assigned by the writer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPurchase {
    pub order_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub qty: u32,
    pub price: f64,
    #[serde(default)]
    pub paid_price: Option<f64>,
    #[serde(default)]
    pub bag_size: String,
    #[serde(default)]
    pub pickup_point: String,
    #[serde(default)]
    pub note: String,
}

/// All-optional field patch. `Some(None)` on a doubly-optional field clears
/// the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchasePatch {
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub qty: Option<u32>,
    pub price: Option<f64>,
    pub paid_price: Option<Option<f64>>,
    pub bag_size: Option<String>,
    pub pickup_point: Option<String>,
    pub note: Option<String>,
    pub picked_up: Option<bool>,
    pub picked_up_at: Option<Option<String>>,
    pub collected: Option<bool>,
    pub collected_at: Option<Option<String>>,
}

impl PurchasePatch {
    pub fn apply(&self, row: &mut PurchaseRow) {
        if let Some(v) = &self.customer_id {
            row.customer_id = v.clone();
        }
        if let Some(v) = &self.customer_name {
            row.customer_name = v.clone();
        }
        if let Some(v) = self.qty {
            row.qty = v;
        }
        if let Some(v) = self.price {
            row.price = v;
        }
        if let Some(v) = &self.paid_price {
            row.paid_price = *v;
        }
        if let Some(v) = &self.bag_size {
            row.bag_size = v.clone();
        }
        if let Some(v) = &self.pickup_point {
            row.pickup_point = v.clone();
        }
        if let Some(v) = &self.note {
            row.note = v.clone();
        }
        if let Some(v) = self.picked_up {
            row.picked_up = v;
        }
        if let Some(v) = &self.picked_up_at {
            row.picked_up_at = v.clone();
        }
        if let Some(v) = self.collected {
            row.collected = v;
        }
        if let Some(v) = &self.collected_at {
            row.collected_at = v.clone();
        }
    }
}

/// Fulfillment channel, normalized from the free-text `pickup_point` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PickupPoint {
    Home,
    Delivery,
    PickupPoint,
    Unknown,
}

/// Alias table for pickup destinations. Matching is case-insensitive
/// substring matching, first hit wins. Permissive on purpose: the field is
/// free text entered by the operator. Policy changes stay local to this
/// table.
const PICKUP_ALIASES: &[(&str, PickupPoint)] = &[
    ("استلام", PickupPoint::PickupPoint),
    ("نقطة", PickupPoint::PickupPoint),
    ("pickup", PickupPoint::PickupPoint),
    ("منزل", PickupPoint::Home),
    ("بيت", PickupPoint::Home),
    ("home", PickupPoint::Home),
    ("توصيل", PickupPoint::Delivery),
    ("مندوب", PickupPoint::Delivery),
    ("delivery", PickupPoint::Delivery),
];

impl PickupPoint {
    pub fn classify(raw: &str) -> PickupPoint {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return PickupPoint::Unknown;
        }
        for (alias, point) in PICKUP_ALIASES {
            if needle.contains(alias) {
                return *point;
            }
        }
        PickupPoint::Unknown
    }
}

/// Caller-side precondition check. The write coordinator never validates;
/// the presentation layer calls this before invoking it.
pub fn validate_new_purchase(fields: &NewPurchase) -> Result<(), LedgerError> {
    if fields.customer_id.trim().is_empty() {
        return Err(LedgerError::validation("a customer must be selected"));
    }
    if fields.qty < 1 || fields.qty > 200 {
        return Err(LedgerError::validation("qty must be between 1 and 200"));
    }
    if !fields.price.is_finite() || fields.price < 0.0 {
        return Err(LedgerError::validation("price must be a non-negative amount"));
    }
    if let Some(paid) = fields.paid_price {
        if !paid.is_finite() || paid < 0.0 {
            return Err(LedgerError::validation(
                "paid_price must be a non-negative amount",
            ));
        }
    }
    Ok(())
}
