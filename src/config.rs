//! Configuration for the conversion orchestrator.
//!
//! All orchestrator behaviour is controlled through [`OrchestratorConfig`],
//! built via its [`OrchestratorConfigBuilder`]. Keeping every knob in one
//! struct makes it trivial to share configs across tasks, log them, and diff
//! two runs to understand why their outcomes differ.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};

/// Configuration for the orchestrator and its service client.
///
/// Built via [`OrchestratorConfig::builder()`] or using
/// [`OrchestratorConfig::default()`].
///
/// # Example
/// ```rust
/// use anyconvert::OrchestratorConfig;
///
/// let config = OrchestratorConfig::builder()
///     .base_url("https://convert.example.com/api")
///     .concurrency(8)
///     .poll_timeout_secs(180)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Base URL of the remote conversion service, without a trailing slash.
    /// Default: `http://localhost:3000/api`.
    pub base_url: String,

    /// Optional user id forwarded on upload and convert requests. The
    /// convert endpoints always receive a `user_id` string — empty when
    /// unset — to satisfy the service's request schema.
    pub user_id: Option<String>,

    /// Number of items converted concurrently. Default: 4.
    ///
    /// Conversions are network-bound; each in-flight item costs one polling
    /// loop, so this bounds outstanding requests against the service rather
    /// than local work.
    pub concurrency: usize,

    /// Initial delay between status polls in milliseconds. Default: 500.
    ///
    /// Doubles after each non-terminal poll: 500 ms → 1 s → 2 s → …, capped
    /// at [`poll_max_backoff_ms`](Self::poll_max_backoff_ms). Exponential
    /// backoff keeps N concurrent pollers from hammering the status endpoint
    /// for long-running jobs while still reacting quickly to short ones.
    pub poll_backoff_ms: u64,

    /// Upper bound for the poll delay in milliseconds. Default: 5000.
    pub poll_max_backoff_ms: u64,

    /// Overall polling deadline per operation in seconds. Default: 120.
    ///
    /// An operation that is still non-terminal when the deadline passes
    /// forces its item to `error`. Website bundling and final rendering each
    /// get their own deadline, so a website item may poll for up to twice
    /// this long in total.
    pub poll_timeout_secs: u64,

    /// Per-request HTTP timeout in seconds. Default: 30.
    pub api_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            user_id: None,
            concurrency: 4,
            poll_backoff_ms: 500,
            poll_max_backoff_ms: 5_000,
            poll_timeout_secs: 120,
            api_timeout_secs: 30,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new builder for `OrchestratorConfig`.
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder {
            config: Self::default(),
        }
    }

    /// The `user_id` value sent on convert requests: the configured id or
    /// an empty string.
    pub(crate) fn user_id_or_empty(&self) -> &str {
        self.user_id.as_deref().unwrap_or("")
    }
}

/// Builder for [`OrchestratorConfig`].
#[derive(Debug)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.config.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.config.user_id = Some(id.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn poll_backoff_ms(mut self, ms: u64) -> Self {
        self.config.poll_backoff_ms = ms;
        self
    }

    pub fn poll_max_backoff_ms(mut self, ms: u64) -> Self {
        self.config.poll_max_backoff_ms = ms;
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OrchestratorConfig, ConvertError> {
        let c = &self.config;
        if c.base_url.is_empty() {
            return Err(ConvertError::InvalidConfig("base_url is empty".into()));
        }
        if c.concurrency == 0 {
            return Err(ConvertError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.poll_backoff_ms == 0 {
            return Err(ConvertError::InvalidConfig(
                "poll_backoff_ms must be ≥ 1".into(),
            ));
        }
        if c.poll_max_backoff_ms < c.poll_backoff_ms {
            return Err(ConvertError::InvalidConfig(format!(
                "poll_max_backoff_ms ({}) is below poll_backoff_ms ({})",
                c.poll_max_backoff_ms, c.poll_backoff_ms
            )));
        }
        if c.poll_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "poll_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = OrchestratorConfig::builder().build().unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.poll_backoff_ms, 500);
        assert_eq!(config.user_id_or_empty(), "");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = OrchestratorConfig::builder()
            .base_url("https://svc.example.com/api/")
            .build()
            .unwrap();
        assert_eq!(config.base_url, "https://svc.example.com/api");
    }

    #[test]
    fn backoff_cap_must_cover_initial_backoff() {
        let err = OrchestratorConfig::builder()
            .poll_backoff_ms(2_000)
            .poll_max_backoff_ms(1_000)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("poll_max_backoff_ms"));
    }

    #[test]
    fn zero_concurrency_is_clamped_by_builder() {
        let config = OrchestratorConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(config.concurrency, 1);
    }
}
