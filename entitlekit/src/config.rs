//! Validation authority configuration.

use std::time::Duration;

use crate::Environment;

/// Sandbox validation authority endpoint.
pub const SANDBOX_VERIFY_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

/// Production validation authority endpoint.
pub const PRODUCTION_VERIFY_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the remote receipt validator.
///
/// The environment is an explicit startup value; the endpoint defaults from
/// it but can be overridden (tests point it at a local mock server).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub environment: Environment,
    pub endpoint: String,
    /// Opaque credential shared with the authority.
    pub shared_secret: String,
    pub timeout: Duration,
}

impl ValidatorConfig {
    /// Create a configuration for `environment` with its default endpoint.
    pub fn new(environment: Environment, shared_secret: impl Into<String>) -> Self {
        let endpoint = match environment {
            Environment::Sandbox => SANDBOX_VERIFY_URL,
            Environment::Production => PRODUCTION_VERIFY_URL,
        };
        Self {
            environment,
            endpoint: endpoint.to_string(),
            shared_secret: shared_secret.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sandbox configuration with the default sandbox endpoint.
    pub fn sandbox(shared_secret: impl Into<String>) -> Self {
        Self::new(Environment::Sandbox, shared_secret)
    }

    /// Production configuration with the default production endpoint.
    pub fn production(shared_secret: impl Into<String>) -> Self {
        Self::new(Environment::Production, shared_secret)
    }

    /// Override the authority endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
