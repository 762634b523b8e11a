//! Shared fake capability implementations for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use entitlekit::{
    CloudAccountOracle, ConnectivityOracle, FetchError, ParsedReceipt, PaymentClient,
    PlatformError, PlatformPurchase, ProductId, ReceiptBlob, ReceiptFetcher, ReceiptItem,
    ReceiptValidator, RestoreBatch, ValidationError,
};

/// Connectivity oracle with a switchable answer.
pub struct FakeNetwork {
    connected: AtomicBool,
}

impl FakeNetwork {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl ConnectivityOracle for FakeNetwork {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Cloud account oracle with a switchable answer.
pub struct FakeCloud {
    available: AtomicBool,
}

impl FakeCloud {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
        }
    }
}

impl CloudAccountOracle for FakeCloud {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// Receipt fetcher that serves a canned result and counts calls.
pub struct FakeFetcher {
    result: Mutex<Result<ReceiptBlob, FetchError>>,
    pub calls: AtomicUsize,
    pub forced_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn returning(blob: ReceiptBlob) -> Self {
        Self {
            result: Mutex::new(Ok(blob)),
            calls: AtomicUsize::new(0),
            forced_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self {
            result: Mutex::new(Err(err)),
            calls: AtomicUsize::new(0),
            forced_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReceiptFetcher for FakeFetcher {
    async fn fetch_receipt(&self, force_refresh: bool) -> Result<ReceiptBlob, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if force_refresh {
            self.forced_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.result
            .lock()
            .expect("fetcher result lock")
            .clone()
    }
}

/// Validator that serves a canned result and counts calls.
pub struct FakeValidator {
    result: Mutex<Result<ParsedReceipt, ValidationError>>,
    pub calls: AtomicUsize,
}

impl FakeValidator {
    pub fn returning(receipt: ParsedReceipt) -> Self {
        Self {
            result: Mutex::new(Ok(receipt)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: ValidationError) -> Self {
        Self {
            result: Mutex::new(Err(err)),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReceiptValidator for FakeValidator {
    async fn validate(&self, _receipt: &ReceiptBlob) -> Result<ParsedReceipt, ValidationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .lock()
            .expect("validator result lock")
            .clone()
    }
}

/// Payment client serving canned purchase/restore results, recording every
/// purchase call and finished transaction.
pub struct FakePaymentClient {
    purchase_result: Mutex<Result<PlatformPurchase, PlatformError>>,
    restore_batch: Mutex<RestoreBatch>,
    pub purchase_calls: AtomicUsize,
    pub finished: Mutex<Vec<String>>,
}

impl FakePaymentClient {
    pub fn purchasing(purchase: PlatformPurchase) -> Self {
        Self {
            purchase_result: Mutex::new(Ok(purchase)),
            restore_batch: Mutex::new(RestoreBatch::default()),
            purchase_calls: AtomicUsize::new(0),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn refusing(err: PlatformError) -> Self {
        Self {
            purchase_result: Mutex::new(Err(err)),
            restore_batch: Mutex::new(RestoreBatch::default()),
            purchase_calls: AtomicUsize::new(0),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn restoring(batch: RestoreBatch) -> Self {
        Self {
            purchase_result: Mutex::new(Err(PlatformError::new(
                entitlekit::PlatformErrorCode::Unknown,
            ))),
            restore_batch: Mutex::new(batch),
            purchase_calls: AtomicUsize::new(0),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn finished_transactions(&self) -> Vec<String> {
        self.finished.lock().expect("finished lock").clone()
    }
}

#[async_trait]
impl PaymentClient for FakePaymentClient {
    async fn purchase(&self, _product: &ProductId) -> Result<PlatformPurchase, PlatformError> {
        self.purchase_calls.fetch_add(1, Ordering::SeqCst);
        self.purchase_result
            .lock()
            .expect("purchase result lock")
            .clone()
    }

    async fn restore_purchases(&self) -> RestoreBatch {
        self.restore_batch
            .lock()
            .expect("restore batch lock")
            .clone()
    }

    async fn finish_transaction(&self, transaction_id: &str) {
        self.finished
            .lock()
            .expect("finished lock")
            .push(transaction_id.to_string());
    }
}

/// A receipt item for `product` purchased at `purchased_ms` and expiring at
/// `expires_ms`.
pub fn receipt_item(product: &str, tx: &str, purchased_ms: i64, expires_ms: i64) -> ReceiptItem {
    ReceiptItem {
        product_id: ProductId::new(product),
        transaction_id: tx.to_string(),
        purchase_date: Utc.timestamp_millis_opt(purchased_ms).unwrap(),
        expires_date: Some(Utc.timestamp_millis_opt(expires_ms).unwrap()),
        cancellation_date: None,
    }
}
