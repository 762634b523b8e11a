//! Injected platform capabilities.
//!
//! The core never talks to the platform directly. Connectivity oracles,
//! receipt retrieval and the purchase/restore sheet are all supplied by the
//! embedding application through these traits, which keeps the pipeline
//! testable with in-memory fakes.

use async_trait::async_trait;

use crate::{ProductId, ReceiptBlob};

/// Reports whether the network is currently reachable.
pub trait ConnectivityOracle: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Reports whether the user's cloud account service is available.
pub trait CloudAccountOracle: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Error from the receipt fetch capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("no receipt present on this device")]
    Missing,
    #[error("receipt fetch failed: {0}")]
    Failed(String),
}

/// Obtains the opaque signed receipt blob from the platform.
#[async_trait]
pub trait ReceiptFetcher: Send + Sync {
    /// Fetch the current receipt. With `force_refresh` the platform is
    /// asked to reissue it from the authority rather than serve a cached
    /// copy.
    async fn fetch_receipt(&self, force_refresh: bool) -> Result<ReceiptBlob, FetchError>;
}

/// Broad, platform-defined failure codes for purchase and restore calls.
///
/// These are the raw shapes the platform reports; the purchase orchestrator
/// maps them into [`crate::PurchaseFailureCause`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformErrorCode {
    Unknown,
    ClientInvalid,
    PaymentCancelled,
    PaymentInvalid,
    PaymentNotAllowed,
    ProductNotAvailable,
    CloudServicePermissionDenied,
    CloudServiceNetworkConnectionFailed,
    CloudServiceRevoked,
    /// Purchase is pending external approval (e.g. family organizer).
    Deferred,
}

/// A platform purchase/restore failure: a broad code plus whatever
/// diagnostic text the platform attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformError {
    pub code: PlatformErrorCode,
    pub message: Option<String>,
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "platform error {:?}: {}", self.code, msg),
            None => write!(f, "platform error {:?}", self.code),
        }
    }
}

impl std::error::Error for PlatformError {}

impl PlatformError {
    pub fn new(code: PlatformErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A successfully initiated platform purchase, not yet finalized.
///
/// Finalization is deferred until post-purchase verification confirms the
/// entitlement (the purchase is non-atomic).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformPurchase {
    pub product_id: ProductId,
    pub transaction_id: String,
}

/// One purchase returned by a platform bulk restore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoredPurchase {
    pub product_id: ProductId,
    pub transaction_id: String,
    /// The platform left the transaction open; the restore orchestrator
    /// must finish it.
    pub needs_finish: bool,
}

/// Raw result of a platform bulk restore: restored purchases and the
/// failures encountered along the way, both possibly non-empty at once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreBatch {
    pub restored: Vec<RestoredPurchase>,
    pub failures: Vec<PlatformError>,
}

/// Opaque platform purchase/restore capability.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Initiate a single non-atomic purchase through the platform sheet.
    async fn purchase(&self, product: &ProductId) -> Result<PlatformPurchase, PlatformError>;

    /// Restore all prior purchases. Never fails as a whole; partial
    /// failures are reported inside the batch.
    async fn restore_purchases(&self) -> RestoreBatch;

    /// Finish an open transaction. Idempotent, safe to call once per
    /// transaction.
    async fn finish_transaction(&self, transaction_id: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_error_display_includes_message() {
        let err = PlatformError::new(PlatformErrorCode::PaymentCancelled);
        assert!(err.to_string().contains("PaymentCancelled"));

        let err = PlatformError::new(PlatformErrorCode::Unknown).with_message("sheet dismissed");
        assert!(err.to_string().contains("sheet dismissed"));
    }
}
