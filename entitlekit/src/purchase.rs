//! Single purchase orchestration with post-purchase verification.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::capabilities::{
    ConnectivityOracle, PaymentClient, PlatformError, PlatformErrorCode, ReceiptFetcher,
};
use crate::evaluator::evaluate;
use crate::receipt::ReceiptItem;
use crate::status::{PurchaseOutcome, SubscriptionKind, SubscriptionStatus};
use crate::validator::{fetch_and_validate, spawn_forced_refetch, ReceiptError, ReceiptValidator};
use crate::ProductId;

/// Fixed enumeration of purchase failure causes, mapped from the
/// platform's broader code set. Uncategorized failures preserve the
/// original cause for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseFailureCause {
    #[error("client is not allowed to issue the request")]
    InvalidClient,
    #[error("user cancelled the purchase")]
    UserCancelled,
    #[error("payment parameters were invalid")]
    PaymentInvalid,
    #[error("user is not allowed to make payments")]
    PaymentNotAllowed,
    #[error("product is not available in the storefront")]
    ProductUnavailable,
    #[error("access to cloud service information was denied")]
    CloudPermissionDenied,
    #[error("could not connect to the cloud service")]
    CloudNetworkFailure,
    #[error("cloud service access was revoked")]
    CloudServiceRevoked,
    #[error("purchase is deferred pending external approval")]
    Deferred,
    #[error("uncategorized platform failure: {cause}")]
    Uncategorized { cause: String },
}

impl PurchaseFailureCause {
    /// True when the user dismissed the payment sheet themselves.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

impl From<PlatformError> for PurchaseFailureCause {
    fn from(err: PlatformError) -> Self {
        match err.code {
            PlatformErrorCode::ClientInvalid => Self::InvalidClient,
            PlatformErrorCode::PaymentCancelled => Self::UserCancelled,
            PlatformErrorCode::PaymentInvalid => Self::PaymentInvalid,
            PlatformErrorCode::PaymentNotAllowed => Self::PaymentNotAllowed,
            PlatformErrorCode::ProductNotAvailable => Self::ProductUnavailable,
            PlatformErrorCode::CloudServicePermissionDenied => Self::CloudPermissionDenied,
            PlatformErrorCode::CloudServiceNetworkConnectionFailed => Self::CloudNetworkFailure,
            PlatformErrorCode::CloudServiceRevoked => Self::CloudServiceRevoked,
            PlatformErrorCode::Deferred => Self::Deferred,
            PlatformErrorCode::Unknown => Self::Uncategorized {
                cause: err.to_string(),
            },
        }
    }
}

/// Failure of a single purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    /// Network unreachable; the platform was never called.
    #[error("network unreachable")]
    NetworkUnavailable,
    /// The platform declined or aborted the purchase.
    #[error("platform purchase failed: {0}")]
    Platform(PurchaseFailureCause),
    /// The purchase went through but the fresh receipt shows the
    /// entitlement already expired.
    #[error("subscription {product_id} expired at {expiry_date}")]
    Expired {
        product_id: ProductId,
        expiry_date: DateTime<Utc>,
        items: Vec<ReceiptItem>,
    },
    /// The purchase went through but the receipt holds no entitlement for
    /// the product.
    #[error("product {0} not present in the validated receipt")]
    NotPurchased(ProductId),
    /// Fetching or validating the receipt failed after the platform
    /// reported success.
    #[error("receipt verification failed for {product_id}: {cause}")]
    ReceiptVerificationFailed {
        product_id: ProductId,
        #[source]
        cause: ReceiptError,
    },
}

/// Drives one purchase attempt: platform sheet, then verification of the
/// resulting entitlement.
///
/// Persists nothing; callers feed a successful outcome into the
/// reconciliation store when running state must reflect it.
pub struct PurchaseOrchestrator {
    payment: Arc<dyn PaymentClient>,
    network: Arc<dyn ConnectivityOracle>,
    fetcher: Arc<dyn ReceiptFetcher>,
    validator: Arc<dyn ReceiptValidator>,
    kind: SubscriptionKind,
}

impl PurchaseOrchestrator {
    pub fn new(
        payment: Arc<dyn PaymentClient>,
        network: Arc<dyn ConnectivityOracle>,
        fetcher: Arc<dyn ReceiptFetcher>,
        validator: Arc<dyn ReceiptValidator>,
    ) -> Self {
        Self {
            payment,
            network,
            fetcher,
            validator,
            kind: SubscriptionKind::AutoRenewable,
        }
    }

    /// Verify under a different subscription kind (default is
    /// auto-renewable).
    pub fn with_kind(mut self, kind: SubscriptionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Purchase `product` and confirm the entitlement.
    ///
    /// The platform purchase is non-atomic: the transaction stays open
    /// until the fresh receipt confirms an active entitlement, at which
    /// point it is finished and the outcome returned. A receipt pipeline
    /// failure surfaces as `ReceiptVerificationFailed` and triggers a
    /// fire-and-forget forced refetch.
    #[tracing::instrument(skip(self), fields(product = %product))]
    pub async fn purchase(&self, product: &ProductId) -> Result<PurchaseOutcome, PurchaseError> {
        if !self.network.is_connected() {
            return Err(PurchaseError::NetworkUnavailable);
        }

        let platform_purchase = self
            .payment
            .purchase(product)
            .await
            .map_err(|err| PurchaseError::Platform(PurchaseFailureCause::from(err)))?;

        let receipt = match fetch_and_validate(&self.fetcher, &self.validator).await {
            Ok(receipt) => receipt,
            Err(cause) => {
                tracing::warn!(product = %product, %cause, "post-purchase verification failed");
                spawn_forced_refetch(&self.fetcher);
                return Err(PurchaseError::ReceiptVerificationFailed {
                    product_id: product.clone(),
                    cause,
                });
            }
        };

        match evaluate(&receipt, product, &self.kind, Utc::now()) {
            SubscriptionStatus::Purchased { expiry_date, items } => {
                self.payment
                    .finish_transaction(&platform_purchase.transaction_id)
                    .await;
                tracing::debug!(product = %product, %expiry_date, "purchase confirmed");
                Ok(PurchaseOutcome {
                    product_id: product.clone(),
                    expiry_date,
                    receipt_items: items,
                })
            }
            SubscriptionStatus::Expired { expiry_date, items } => Err(PurchaseError::Expired {
                product_id: product.clone(),
                expiry_date,
                items,
            }),
            SubscriptionStatus::NotPurchased => {
                Err(PurchaseError::NotPurchased(product.clone()))
            }
        }
    }
}
