use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use valist_ledger::PollPolicy;

use crate::error::{SdkError, SdkResult};

/// Client configuration, usually loaded from a TOML file.
///
/// ```toml
/// chain_id = 1337
///
/// [confirmation]
/// timeout_ms = 60000
/// initial_poll_ms = 50
/// max_poll_ms = 2000
/// backoff_factor = 2
///
/// [cache]
/// enabled = true
/// record_ttl_ms = 15000
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Chain the client expects to talk to. `None` accepts whatever chain
    /// the ledger reports.
    pub chain_id: Option<u64>,
    pub confirmation: ConfirmationConfig,
    pub cache: CacheConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Upper bound on waiting for a receipt, applied on top of the caller's
    /// own deadline.
    pub timeout_ms: u64,
    pub initial_poll_ms: u64,
    pub max_poll_ms: u64,
    pub backoff_factor: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            initial_poll_ms: 50,
            max_poll_ms: 2_000,
            backoff_factor: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// How long ledger records stay cached. Metadata blobs are immutable and
    /// never expire.
    pub record_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            record_ttl_ms: 15_000,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| SdkError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn validate(&self) -> SdkResult<()> {
        let c = &self.confirmation;
        if c.timeout_ms == 0 {
            return Err(SdkError::Config("confirmation.timeout_ms must be positive".into()));
        }
        if c.initial_poll_ms == 0 {
            return Err(SdkError::Config(
                "confirmation.initial_poll_ms must be positive".into(),
            ));
        }
        if c.max_poll_ms < c.initial_poll_ms {
            return Err(SdkError::Config(
                "confirmation.max_poll_ms must not be below initial_poll_ms".into(),
            ));
        }
        if c.backoff_factor == 0 {
            return Err(SdkError::Config(
                "confirmation.backoff_factor must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(self.confirmation.initial_poll_ms),
            max_interval: Duration::from_millis(self.confirmation.max_poll_ms),
            backoff_factor: self.confirmation.backoff_factor,
        }
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation.timeout_ms)
    }

    pub fn record_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.record_ttl_ms)
    }
}
