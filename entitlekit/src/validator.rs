//! Receipt validation against the remote validation authority.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::capabilities::{FetchError, ReceiptFetcher};
use crate::config::ValidatorConfig;
use crate::receipt::{ParsedReceipt, ReceiptItem};
use crate::ReceiptBlob;

/// Structured rejection code returned by the validation authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorityStatus {
    /// The receipt data was malformed or unreadable.
    MalformedReceiptData,
    /// The receipt could not be authenticated (signature mismatch).
    AuthenticationFailed,
    /// The shared secret did not match.
    SharedSecretMismatch,
    /// The authority is temporarily unavailable.
    AuthorityUnavailable,
    /// A sandbox receipt was sent to the production endpoint.
    SandboxReceiptOnProduction,
    /// A production receipt was sent to the sandbox endpoint.
    ProductionReceiptOnSandbox,
    /// Any other non-zero status, preserved for diagnostics.
    Unrecognized(i64),
}

impl AuthorityStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            21002 => Self::MalformedReceiptData,
            21003 => Self::AuthenticationFailed,
            21004 => Self::SharedSecretMismatch,
            21005 => Self::AuthorityUnavailable,
            21007 => Self::SandboxReceiptOnProduction,
            21008 => Self::ProductionReceiptOnSandbox,
            other => Self::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::MalformedReceiptData => 21002,
            Self::AuthenticationFailed => 21003,
            Self::SharedSecretMismatch => 21004,
            Self::AuthorityUnavailable => 21005,
            Self::SandboxReceiptOnProduction => 21007,
            Self::ProductionReceiptOnSandbox => 21008,
            Self::Unrecognized(code) => *code,
        }
    }
}

impl std::fmt::Display for AuthorityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedReceiptData => write!(f, "malformed receipt data (21002)"),
            Self::AuthenticationFailed => write!(f, "receipt authentication failed (21003)"),
            Self::SharedSecretMismatch => write!(f, "shared secret mismatch (21004)"),
            Self::AuthorityUnavailable => write!(f, "authority unavailable (21005)"),
            Self::SandboxReceiptOnProduction => {
                write!(f, "sandbox receipt sent to production (21007)")
            }
            Self::ProductionReceiptOnSandbox => {
                write!(f, "production receipt sent to sandbox (21008)")
            }
            Self::Unrecognized(code) => write!(f, "unrecognized authority status {}", code),
        }
    }
}

/// Failure while validating a receipt with the authority.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authority rejected receipt: {0}")]
    Rejected(AuthorityStatus),
    #[error("malformed authority response: {0}")]
    MalformedResponse(String),
    #[error("invalid validator configuration: {0}")]
    InvalidConfig(String),
}

impl ValidationError {
    /// True when the failure happened in transit rather than as an
    /// authority decision.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ValidationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Either stage of the fetch-then-validate pipeline failing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Sends a signed receipt to a validation authority and returns the
/// trust-verified parse.
#[async_trait]
pub trait ReceiptValidator: Send + Sync {
    async fn validate(&self, receipt: &ReceiptBlob) -> Result<ParsedReceipt, ValidationError>;
}

#[derive(Serialize)]
struct AuthorityRequest<'a> {
    #[serde(rename = "receipt-data")]
    receipt_data: String,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthorityResponse {
    status: i64,
    #[serde(default)]
    receipt: Option<ReceiptPayload>,
}

#[derive(Deserialize)]
struct ReceiptPayload {
    #[serde(default)]
    in_app: Vec<ReceiptItem>,
}

/// Production [`ReceiptValidator`] backed by an HTTP call to the configured
/// authority endpoint.
///
/// The endpoint is fixed by configuration at construction time; a rejection
/// never triggers a retry against the other environment here.
pub struct RemoteReceiptValidator {
    config: ValidatorConfig,
    client: reqwest::Client,
}

impl RemoteReceiptValidator {
    /// Create a validator for the configured environment.
    pub fn new(config: ValidatorConfig) -> Result<Self, ValidationError> {
        if config.shared_secret.is_empty() {
            return Err(ValidationError::InvalidConfig(
                "shared secret cannot be empty".to_string(),
            ));
        }
        if config.endpoint.is_empty() {
            return Err(ValidationError::InvalidConfig(
                "endpoint cannot be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ValidationError::Transport(err.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }
}

#[async_trait]
impl ReceiptValidator for RemoteReceiptValidator {
    #[tracing::instrument(skip(self, receipt), fields(environment = %self.config.environment, receipt_len = receipt.len()))]
    async fn validate(&self, receipt: &ReceiptBlob) -> Result<ParsedReceipt, ValidationError> {
        let body = AuthorityRequest {
            receipt_data: base64::engine::general_purpose::STANDARD.encode(receipt.as_bytes()),
            password: &self.config.shared_secret,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::Transport(format!(
                "authority returned HTTP {}",
                status
            )));
        }

        let parsed: AuthorityResponse = response
            .json()
            .await
            .map_err(|err| ValidationError::MalformedResponse(err.to_string()))?;

        if parsed.status != 0 {
            let rejection = AuthorityStatus::from_code(parsed.status);
            tracing::warn!(status = parsed.status, "authority rejected receipt");
            return Err(ValidationError::Rejected(rejection));
        }

        let payload = parsed.receipt.ok_or_else(|| {
            ValidationError::MalformedResponse("status 0 without receipt body".to_string())
        })?;

        tracing::debug!(items = payload.in_app.len(), "receipt validated");
        Ok(ParsedReceipt::new(payload.in_app))
    }
}

/// Fetch the current receipt and validate it in one step.
pub(crate) async fn fetch_and_validate(
    fetcher: &Arc<dyn ReceiptFetcher>,
    validator: &Arc<dyn ReceiptValidator>,
) -> Result<ParsedReceipt, ReceiptError> {
    let blob = fetcher.fetch_receipt(false).await?;
    let parsed = validator.validate(&blob).await?;
    Ok(parsed)
}

/// Kick off a forced receipt refetch without awaiting it.
///
/// The refetch outcome is deliberately discarded: the current call already
/// failed and reports its own error; the refetch only primes the next
/// attempt with a fresh receipt.
pub(crate) fn spawn_forced_refetch(fetcher: &Arc<dyn ReceiptFetcher>) {
    let fetcher = Arc::clone(fetcher);
    tokio::spawn(async move {
        if let Err(err) = fetcher.fetch_receipt(true).await {
            tracing::debug!(%err, "forced receipt refetch failed");
        }
    });
}
