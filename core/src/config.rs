//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ErrorKind, OperationError};

pub const BASE_URL_ENV: &str = "ACCOUNTS_SERVICE_BASE_URL";
pub const TIMEOUT_ENV: &str = "ACCOUNTS_SERVICE_TIMEOUT_SECS";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Where the accounts service lives and how long a request may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Global per-request timeout enforced by the transport. `None` waits
    /// indefinitely.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create configuration from environment variables
    ///
    /// Reads:
    /// - `ACCOUNTS_SERVICE_BASE_URL`: service root (default: `http://localhost:8080`)
    /// - `ACCOUNTS_SERVICE_TIMEOUT_SECS`: optional timeout in whole seconds
    pub fn from_env() -> Result<Self, OperationError> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let config = Self::new(base_url);

        match std::env::var(TIMEOUT_ENV) {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| {
                    OperationError::new(
                        ErrorKind::InvalidConfiguration,
                        format!("{TIMEOUT_ENV} must be a whole number of seconds"),
                    )
                    .with_cause(e)
                })?;
                Ok(config.with_timeout(Duration::from_secs(secs)))
            }
            Err(_) => Ok(config),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Check that `base_url` is an absolute http(s) URL and strip trailing
/// slashes so paths can be appended with a single `/`.
pub(crate) fn validate_base_url(base_url: &str) -> Result<String, OperationError> {
    let parsed = Url::parse(base_url).map_err(|e| OperationError::invalid_url().with_cause(e))?;
    if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
        return Err(OperationError::invalid_url());
    }
    Ok(base_url.trim_end_matches('/').to_string())
}
