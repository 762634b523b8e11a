//! Bulk restoration of prior purchases.

use std::sync::Arc;

use crate::capabilities::{ConnectivityOracle, PaymentClient, RestoredPurchase};
use crate::purchase::PurchaseFailureCause;

/// Failure to even begin a restore attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    #[error("network unreachable")]
    NetworkUnavailable,
}

/// One failed restoration: the mapped cause plus the platform's optional
/// diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFailure {
    pub cause: PurchaseFailureCause,
    pub message: Option<String>,
}

/// Outcome of a bulk restore.
///
/// `PartiallyFailed` takes precedence over `Restored` even when some
/// purchases also succeeded, so callers must inspect the failure list
/// rather than assume total failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored(Vec<RestoredPurchase>),
    PartiallyFailed(Vec<RestoreFailure>),
    NothingToRestore,
}

/// Drives platform bulk restore and partitions the result.
pub struct RestoreOrchestrator {
    payment: Arc<dyn PaymentClient>,
    network: Arc<dyn ConnectivityOracle>,
}

impl RestoreOrchestrator {
    pub fn new(payment: Arc<dyn PaymentClient>, network: Arc<dyn ConnectivityOracle>) -> Self {
        Self { payment, network }
    }

    /// Restore all prior purchases.
    ///
    /// Every restored purchase left open by the platform is finished
    /// (idempotent side effect, not reflected in the return value) before
    /// the outcome is decided: any failures present mean
    /// `PartiallyFailed`, else restored purchases mean `Restored`, else
    /// `NothingToRestore`.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self) -> Result<RestoreOutcome, RestoreError> {
        if !self.network.is_connected() {
            return Err(RestoreError::NetworkUnavailable);
        }

        let batch = self.payment.restore_purchases().await;

        for purchase in batch.restored.iter().filter(|p| p.needs_finish) {
            self.payment.finish_transaction(&purchase.transaction_id).await;
        }

        if !batch.failures.is_empty() {
            tracing::warn!(
                failed = batch.failures.len(),
                restored = batch.restored.len(),
                "restore completed with failures"
            );
            let failures = batch
                .failures
                .into_iter()
                .map(|err| RestoreFailure {
                    message: err.message.clone(),
                    cause: PurchaseFailureCause::from(err),
                })
                .collect();
            return Ok(RestoreOutcome::PartiallyFailed(failures));
        }

        if batch.restored.is_empty() {
            tracing::debug!("nothing to restore");
            Ok(RestoreOutcome::NothingToRestore)
        } else {
            tracing::debug!(restored = batch.restored.len(), "restore complete");
            Ok(RestoreOutcome::Restored(batch.restored))
        }
    }
}
