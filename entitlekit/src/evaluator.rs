//! Pure evaluation of a parsed receipt into a subscription status.

use chrono::{DateTime, Utc};

use crate::receipt::{ParsedReceipt, ReceiptItem};
use crate::status::{SubscriptionKind, SubscriptionStatus};
use crate::ProductId;

/// Determine the status of `product` from `receipt` as of `as_of`.
///
/// Pure function of its inputs: no retries, no clock access, no I/O.
///
/// The governing record is the non-cancelled matching entry with the
/// latest effective expiry; expiry strictly after `as_of` means
/// `Purchased`, at or before means `Expired`. All matching records
/// (cancelled ones included) travel in the returned `items` for
/// auditability. A receipt with no usable entitlement for the product
/// yields `NotPurchased`.
pub fn evaluate(
    receipt: &ParsedReceipt,
    product: &ProductId,
    kind: &SubscriptionKind,
    as_of: DateTime<Utc>,
) -> SubscriptionStatus {
    let items = receipt.items_for(product);

    let governing_expiry = items
        .iter()
        .filter(|item| !item.is_cancelled())
        .filter_map(|item| effective_expiry(item, kind))
        .max();

    match governing_expiry {
        Some(expiry) if expiry > as_of => SubscriptionStatus::Purchased {
            expiry_date: expiry,
            items,
        },
        Some(expiry) => SubscriptionStatus::Expired {
            expiry_date: expiry,
            items,
        },
        None => SubscriptionStatus::NotPurchased,
    }
}

/// Effective expiry of one record under the given subscription kind.
///
/// Auto-renewable entitlements carry their expiry on the wire; records
/// without one (e.g. consumables sharing the receipt) grant nothing.
/// Non-renewing entitlements run for a fixed duration from purchase.
fn effective_expiry(item: &ReceiptItem, kind: &SubscriptionKind) -> Option<DateTime<Utc>> {
    match kind {
        SubscriptionKind::AutoRenewable => item.expires_date,
        SubscriptionKind::NonRenewing { valid_duration } => {
            Some(item.purchase_date + *valid_duration)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn product() -> ProductId {
        ProductId::new("sub.monthly")
    }

    fn item(tx: &str, purchased: i64, expires: Option<i64>, cancelled: Option<i64>) -> ReceiptItem {
        ReceiptItem {
            product_id: product(),
            transaction_id: tx.to_string(),
            purchase_date: Utc.timestamp_millis_opt(purchased).unwrap(),
            expires_date: expires.map(|ms| Utc.timestamp_millis_opt(ms).unwrap()),
            cancellation_date: cancelled.map(|ms| Utc.timestamp_millis_opt(ms).unwrap()),
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn future_expiry_is_purchased() {
        let receipt = ParsedReceipt::new(vec![item("t1", 1_000, Some(10_000), None)]);
        let status = evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000));
        assert_eq!(
            status,
            SubscriptionStatus::Purchased {
                expiry_date: at(10_000),
                items: receipt.items_for(&product()),
            }
        );
    }

    #[test]
    fn past_expiry_is_expired() {
        let receipt = ParsedReceipt::new(vec![item("t1", 1_000, Some(4_000), None)]);
        let status = evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000));
        assert!(matches!(status, SubscriptionStatus::Expired { expiry_date, .. } if expiry_date == at(4_000)));
    }

    #[test]
    fn expiry_equal_to_as_of_is_expired() {
        // Strictly-after comparison: the boundary instant does not grant entitlement.
        let receipt = ParsedReceipt::new(vec![item("t1", 1_000, Some(5_000), None)]);
        let status = evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000));
        assert!(matches!(status, SubscriptionStatus::Expired { .. }));
    }

    #[test]
    fn missing_record_is_not_purchased() {
        let receipt = ParsedReceipt::default();
        let status = evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000));
        assert_eq!(status, SubscriptionStatus::NotPurchased);
    }

    #[test]
    fn latest_renewal_governs_but_all_items_returned() {
        let receipt = ParsedReceipt::new(vec![
            item("t1", 1_000, Some(4_000), None),
            item("t2", 4_000, Some(9_000), None),
        ]);
        let status = evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000));
        match status {
            SubscriptionStatus::Purchased { expiry_date, items } => {
                assert_eq!(expiry_date, at(9_000));
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected Purchased, got {:?}", other),
        }
    }

    #[test]
    fn cancelled_records_never_govern() {
        let receipt = ParsedReceipt::new(vec![
            item("t1", 1_000, Some(4_000), None),
            item("t2", 4_000, Some(9_000), Some(4_500)),
        ]);
        let status = evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000));
        match status {
            SubscriptionStatus::Expired { expiry_date, items } => {
                assert_eq!(expiry_date, at(4_000));
                // Audit trail still carries the cancelled record.
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected Expired, got {:?}", other),
        }
    }

    #[test]
    fn all_records_cancelled_is_not_purchased() {
        let receipt = ParsedReceipt::new(vec![item("t1", 1_000, Some(9_000), Some(2_000))]);
        let status = evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000));
        assert_eq!(status, SubscriptionStatus::NotPurchased);
    }

    #[test]
    fn record_without_expiry_grants_nothing_for_auto_renewable() {
        let receipt = ParsedReceipt::new(vec![item("t1", 1_000, None, None)]);
        let status = evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000));
        assert_eq!(status, SubscriptionStatus::NotPurchased);
    }

    #[test]
    fn non_renewing_expiry_runs_from_purchase_date() {
        let kind = SubscriptionKind::NonRenewing {
            valid_duration: Duration::milliseconds(3_000),
        };
        let receipt = ParsedReceipt::new(vec![item("t1", 1_000, None, None)]);

        let status = evaluate(&receipt, &product(), &kind, at(3_500));
        assert!(matches!(status, SubscriptionStatus::Purchased { expiry_date, .. } if expiry_date == at(4_000)));

        let status = evaluate(&receipt, &product(), &kind, at(4_000));
        assert!(matches!(status, SubscriptionStatus::Expired { .. }));
    }

    #[test]
    fn other_products_do_not_leak_into_items() {
        let mut foreign = item("t9", 1_000, Some(99_000), None);
        foreign.product_id = ProductId::new("sub.yearly");
        let receipt = ParsedReceipt::new(vec![foreign, item("t1", 1_000, Some(10_000), None)]);

        match evaluate(&receipt, &product(), &SubscriptionKind::AutoRenewable, at(5_000)) {
            SubscriptionStatus::Purchased { expiry_date, items } => {
                assert_eq!(expiry_date, at(10_000));
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].transaction_id, "t1");
            }
            other => panic!("expected Purchased, got {:?}", other),
        }
    }
}
