//! Subscription status and reconciled per-product snapshots.

use chrono::{DateTime, Duration, Utc};

use crate::receipt::ReceiptItem;
use crate::ProductId;

/// Kind of subscription entitlement being evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionKind {
    /// Renewed by the platform until cancelled; expiry comes from the
    /// receipt record itself.
    AutoRenewable,
    /// Purchased once for a fixed period; the receipt carries no expiry,
    /// so entitlement runs from purchase date for `valid_duration`.
    NonRenewing { valid_duration: Duration },
}

/// Outcome of evaluating one product against a parsed receipt.
///
/// Exactly one variant holds per (product, evaluation) pair. `Expired` and
/// `NotPurchased` are typed negative results, not failures: the receipt was
/// read successfully and simply does not grant entitlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// An entitlement is active; expires strictly after the evaluation
    /// instant. `items` carries every matching record for auditability.
    Purchased {
        expiry_date: DateTime<Utc>,
        items: Vec<ReceiptItem>,
    },
    /// An entitlement existed but its latest expiry is at or before the
    /// evaluation instant.
    Expired {
        expiry_date: DateTime<Utc>,
        items: Vec<ReceiptItem>,
    },
    /// The receipt holds no entitlement for the product.
    NotPurchased,
}

impl SubscriptionStatus {
    /// True only for an active entitlement.
    pub fn is_purchased(&self) -> bool {
        matches!(self, SubscriptionStatus::Purchased { .. })
    }
}

/// Per-product snapshot held by the reconciliation store.
///
/// Set membership and replacement are keyed solely by `product_id`;
/// upserting an item with an existing id overwrites the other fields
/// without creating a duplicate entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciledItem {
    pub product_id: ProductId,
    pub expiry_date: Option<DateTime<Utc>>,
    pub receipt_items: Vec<ReceiptItem>,
    pub subscribed: bool,
}

impl ReconciledItem {
    /// Snapshot equivalent to "never purchased". Also used when the
    /// network is unreachable or validation failed, so a sweep always
    /// settles every tracked product.
    pub fn not_purchased(product_id: ProductId) -> Self {
        Self {
            product_id,
            expiry_date: None,
            receipt_items: Vec::new(),
            subscribed: false,
        }
    }

    /// Derive a snapshot from an evaluated status.
    pub fn from_status(product_id: ProductId, status: &SubscriptionStatus) -> Self {
        match status {
            SubscriptionStatus::Purchased { expiry_date, items } => Self {
                product_id,
                expiry_date: Some(*expiry_date),
                receipt_items: items.clone(),
                subscribed: true,
            },
            SubscriptionStatus::Expired { expiry_date, items } => Self {
                product_id,
                expiry_date: Some(*expiry_date),
                receipt_items: items.clone(),
                subscribed: false,
            },
            SubscriptionStatus::NotPurchased => Self::not_purchased(product_id),
        }
    }
}

/// Result of a single successful purchase attempt, returned only after
/// post-purchase verification confirmed the entitlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub product_id: ProductId,
    pub expiry_date: DateTime<Utc>,
    pub receipt_items: Vec<ReceiptItem>,
}
