//! Entitlekit library.
//!
//! Determines, for a catalog of subscription products, whether each is
//! currently active, expired, or never purchased, by validating a signed
//! receipt against a remote validation authority and reconciling the result
//! into an observable per-product state set.
//!
//! This crate intentionally stays stateless about the platform: network
//! reachability, cloud-account availability, receipt retrieval and the
//! platform purchase sheet are all injected through capability traits, so
//! applications (and tests) supply their own implementations.
//!
//! # Example
//!
//! ```ignore
//! use entitlekit::{
//!     ProductId, ReconciliationStore, RemoteReceiptValidator, SubscriptionVerifier,
//!     ValidatorConfig,
//! };
//! use std::sync::Arc;
//!
//! let catalog = vec![ProductId::new("sub.monthly"), ProductId::new("sub.yearly")];
//! let store = Arc::new(ReconciliationStore::new(catalog.clone()));
//! let validator = RemoteReceiptValidator::new(ValidatorConfig::production("secret"))?;
//!
//! let verifier = SubscriptionVerifier::new(
//!     store.clone(),
//!     network_oracle,
//!     cloud_oracle,
//!     receipt_fetcher,
//!     Arc::new(validator),
//! );
//! verifier.verify_all(catalog).await?;
//! assert!(store.is_fully_processed());
//! ```

pub mod capabilities;
pub mod config;
pub mod evaluator;
pub mod purchase;
pub mod receipt;
pub mod restore;
pub mod status;
pub mod store;
pub mod validator;
pub mod verifier;

pub use capabilities::{
    CloudAccountOracle, ConnectivityOracle, FetchError, PaymentClient, PlatformError,
    PlatformErrorCode, PlatformPurchase, ReceiptFetcher, RestoreBatch, RestoredPurchase,
};
pub use config::{ValidatorConfig, PRODUCTION_VERIFY_URL, SANDBOX_VERIFY_URL};
pub use evaluator::evaluate;
pub use purchase::{PurchaseError, PurchaseFailureCause, PurchaseOrchestrator};
pub use receipt::{ParsedReceipt, ReceiptItem};
pub use restore::{RestoreError, RestoreFailure, RestoreOrchestrator, RestoreOutcome};
pub use status::{PurchaseOutcome, ReconciledItem, SubscriptionKind, SubscriptionStatus};
pub use store::ReconciliationStore;
pub use validator::{
    AuthorityStatus, ReceiptError, ReceiptValidator, RemoteReceiptValidator, ValidationError,
};
pub use verifier::{SubscriptionVerifier, VerifyError};

/// Identifier for a purchasable subscription SKU.
///
/// Opaque string, stable for the lifetime of the app catalog, and the sole
/// key under which reconciled state is stored.
///
/// # Example
///
/// ```
/// use entitlekit::ProductId;
///
/// // Create from &str
/// let product: ProductId = "sub.monthly".into();
///
/// // Or explicitly
/// let product = ProductId::new("sub.yearly");
///
/// // Access the inner value
/// assert!(product.as_str().starts_with("sub."));
/// ```
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ProductId(pub String);

impl ProductId {
    /// Create a new ProductId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque signed receipt obtained from the platform.
///
/// The core never interprets these bytes; they are passed verbatim to the
/// validation authority, which performs signature checking and decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptBlob(pub Vec<u8>);

impl ReceiptBlob {
    /// Wrap raw receipt bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check whether the blob is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the length of the blob in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<u8>> for ReceiptBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ReceiptBlob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Validation authority environment.
///
/// Selected by deployment configuration at startup, never derived from the
/// receipt being validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    /// Sandbox authority, for development and review builds.
    Sandbox,
    /// Production authority.
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Sandbox => write!(f, "sandbox"),
            Environment::Production => write!(f, "production"),
        }
    }
}
