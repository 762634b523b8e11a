//! Verification sweep over the product catalog.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;

use crate::capabilities::{CloudAccountOracle, ConnectivityOracle, ReceiptFetcher};
use crate::evaluator::evaluate;
use crate::status::{ReconciledItem, SubscriptionKind};
use crate::store::ReconciliationStore;
use crate::validator::{fetch_and_validate, spawn_forced_refetch, ReceiptValidator};
use crate::ProductId;

/// Failure to even begin a verification sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("cloud account service unavailable")]
    CloudUnavailable,
}

/// Drives the fetch → validate → evaluate pipeline for every product in a
/// sweep and reconciles each result into the store.
///
/// One independent asynchronous evaluation runs per product id; they
/// complete and publish in any order. Each product settles to exactly one
/// upsert, so a finished sweep always leaves one entry per swept id and
/// re-running a sweep simply overwrites.
pub struct SubscriptionVerifier {
    store: Arc<ReconciliationStore>,
    network: Arc<dyn ConnectivityOracle>,
    cloud: Arc<dyn CloudAccountOracle>,
    fetcher: Arc<dyn ReceiptFetcher>,
    validator: Arc<dyn ReceiptValidator>,
    kind: SubscriptionKind,
}

impl SubscriptionVerifier {
    pub fn new(
        store: Arc<ReconciliationStore>,
        network: Arc<dyn ConnectivityOracle>,
        cloud: Arc<dyn CloudAccountOracle>,
        fetcher: Arc<dyn ReceiptFetcher>,
        validator: Arc<dyn ReceiptValidator>,
    ) -> Self {
        Self {
            store,
            network,
            cloud,
            fetcher,
            validator,
            kind: SubscriptionKind::AutoRenewable,
        }
    }

    /// Evaluate under a different subscription kind (default is
    /// auto-renewable).
    pub fn with_kind(mut self, kind: SubscriptionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Get the store this verifier reconciles into.
    pub fn store(&self) -> &Arc<ReconciliationStore> {
        &self.store
    }

    /// Verify every product id and upsert one reconciled entry each.
    ///
    /// Fails fast when the cloud account oracle reports unavailable;
    /// otherwise each id settles independently:
    /// - network unreachable: a not-purchased-equivalent entry, no remote
    ///   call;
    /// - fetch or validation failure: the same entry, plus a
    ///   fire-and-forget forced refetch whose outcome is discarded;
    /// - success: an entry derived from the evaluated status.
    ///
    /// The sweep is not atomic across ids; an interrupted sweep leaves the
    /// entries already applied, and re-running overwrites them all.
    #[tracing::instrument(skip(self, products))]
    pub async fn verify_all(
        &self,
        products: impl IntoIterator<Item = ProductId>,
    ) -> Result<(), VerifyError> {
        if !self.cloud.is_available() {
            tracing::warn!("cloud account unavailable, skipping verification sweep");
            return Err(VerifyError::CloudUnavailable);
        }

        let products: BTreeSet<ProductId> = products.into_iter().collect();
        let mut tasks = JoinSet::new();
        for product in products {
            let store = Arc::clone(&self.store);
            let network = Arc::clone(&self.network);
            let fetcher = Arc::clone(&self.fetcher);
            let validator = Arc::clone(&self.validator);
            let kind = self.kind.clone();

            tasks.spawn(async move {
                verify_one(&store, &network, &fetcher, &validator, &kind, product).await;
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                tracing::warn!(%err, "verification task panicked");
            }
        }
        Ok(())
    }
}

async fn verify_one(
    store: &ReconciliationStore,
    network: &Arc<dyn ConnectivityOracle>,
    fetcher: &Arc<dyn ReceiptFetcher>,
    validator: &Arc<dyn ReceiptValidator>,
    kind: &SubscriptionKind,
    product: ProductId,
) {
    if !network.is_connected() {
        tracing::debug!(product = %product, "network unreachable, recording as not purchased");
        store.upsert(ReconciledItem::not_purchased(product));
        return;
    }

    match fetch_and_validate(fetcher, validator).await {
        Ok(receipt) => {
            let status = evaluate(&receipt, &product, kind, Utc::now());
            store.upsert(ReconciledItem::from_status(product, &status));
        }
        Err(err) => {
            tracing::warn!(product = %product, %err, "receipt verification failed");
            store.upsert(ReconciledItem::not_purchased(product));
            spawn_forced_refetch(fetcher);
        }
    }
}
