//! Trust-verified receipt structures returned by the validation authority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProductId;

/// One transaction record within a parsed receipt.
///
/// Immutable once parsed. Timestamps travel as millisecond epochs on the
/// wire; subscription records carry an expiry, one-off records do not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub product_id: ProductId,
    pub transaction_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub purchase_date: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub expires_date: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub cancellation_date: Option<DateTime<Utc>>,
}

impl ReceiptItem {
    /// True when the authority recorded a cancellation (refund) for this
    /// transaction. Cancelled records never grant entitlement.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_date.is_some()
    }
}

/// The decoded, trust-verified receipt returned by the validation authority.
///
/// Contains zero or more transaction records across all products the user
/// has ever purchased on this account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedReceipt {
    pub items: Vec<ReceiptItem>,
}

impl ParsedReceipt {
    pub fn new(items: Vec<ReceiptItem>) -> Self {
        Self { items }
    }

    /// All transaction records for `product`, ordered by purchase date.
    pub fn items_for(&self, product: &ProductId) -> Vec<ReceiptItem> {
        let mut matching: Vec<ReceiptItem> = self
            .items
            .iter()
            .filter(|item| &item.product_id == product)
            .cloned()
            .collect();
        matching.sort_by_key(|item| item.purchase_date);
        matching
    }

    /// Check whether the receipt holds any record for `product`.
    pub fn contains(&self, product: &ProductId) -> bool {
        self.items.iter().any(|item| &item.product_id == product)
    }
}
