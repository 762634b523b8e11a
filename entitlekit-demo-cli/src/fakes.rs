//! In-memory capability implementations backing the demo.
//!
//! These stand in for the platform: a switchable network/cloud answer, a
//! static receipt blob, a validator that fabricates a parsed receipt, and
//! a payment client scripted from command-line flags.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use entitlekit::{
    CloudAccountOracle, ConnectivityOracle, FetchError, ParsedReceipt, PaymentClient,
    PlatformError, PlatformErrorCode, PlatformPurchase, ProductId, ReceiptBlob, ReceiptFetcher,
    ReceiptItem, ReceiptValidator, RestoreBatch, RestoredPurchase, ValidationError,
};

pub struct DemoNetwork {
    pub connected: bool,
}

impl ConnectivityOracle for DemoNetwork {
    fn is_connected(&self) -> bool {
        self.connected
    }
}

pub struct DemoCloud {
    pub available: bool,
}

impl CloudAccountOracle for DemoCloud {
    fn is_available(&self) -> bool {
        self.available
    }
}

pub struct DemoFetcher;

#[async_trait]
impl ReceiptFetcher for DemoFetcher {
    async fn fetch_receipt(&self, force_refresh: bool) -> Result<ReceiptBlob, FetchError> {
        if force_refresh {
            tracing::info!("forced receipt refetch requested");
        }
        Ok(ReceiptBlob::new(b"demo-signed-receipt".as_slice()))
    }
}

/// Validator that skips the authority and fabricates records for the given
/// products, active or expired depending on the demo flags.
pub struct DemoValidator {
    receipt: ParsedReceipt,
}

impl DemoValidator {
    pub fn with_subscriptions(products: &[ProductId], expired: bool) -> Self {
        let now = Utc::now();
        let (purchased, expires) = if expired {
            (now - Duration::days(40), now - Duration::days(10))
        } else {
            (now - Duration::days(10), now + Duration::days(20))
        };

        let items = products
            .iter()
            .enumerate()
            .map(|(n, product)| ReceiptItem {
                product_id: product.clone(),
                transaction_id: format!("demo-txn-{n}"),
                purchase_date: purchased,
                expires_date: Some(expires),
                cancellation_date: None,
            })
            .collect();

        Self {
            receipt: ParsedReceipt::new(items),
        }
    }
}

#[async_trait]
impl ReceiptValidator for DemoValidator {
    async fn validate(&self, _receipt: &ReceiptBlob) -> Result<ParsedReceipt, ValidationError> {
        Ok(self.receipt.clone())
    }
}

/// Payment client scripted from the command line.
pub struct DemoPaymentClient {
    pub cancel_purchase: bool,
    pub restore_batch: RestoreBatch,
}

impl DemoPaymentClient {
    pub fn new(cancel_purchase: bool) -> Self {
        Self {
            cancel_purchase,
            restore_batch: RestoreBatch::default(),
        }
    }

    pub fn with_restorable(mut self, products: &[ProductId], fail_one: bool) -> Self {
        self.restore_batch.restored = products
            .iter()
            .enumerate()
            .map(|(n, product)| RestoredPurchase {
                product_id: product.clone(),
                transaction_id: format!("demo-restore-{n}"),
                needs_finish: true,
            })
            .collect();
        if fail_one {
            self.restore_batch.failures.push(
                PlatformError::new(PlatformErrorCode::CloudServiceNetworkConnectionFailed)
                    .with_message("simulated cloud outage"),
            );
        }
        self
    }
}

#[async_trait]
impl PaymentClient for DemoPaymentClient {
    async fn purchase(&self, product: &ProductId) -> Result<PlatformPurchase, PlatformError> {
        if self.cancel_purchase {
            return Err(PlatformError::new(PlatformErrorCode::PaymentCancelled));
        }
        Ok(PlatformPurchase {
            product_id: product.clone(),
            transaction_id: "demo-txn-0".to_string(),
        })
    }

    async fn restore_purchases(&self) -> RestoreBatch {
        self.restore_batch.clone()
    }

    async fn finish_transaction(&self, transaction_id: &str) {
        tracing::info!(transaction_id, "finished transaction");
    }
}
