//! Endpoint and HTTP connection configuration
//!
//! This module provides the client configuration for an OpenAI-compatible
//! endpoint and the shared connection pool every probe goes through.

use std::time::Duration;

use probe_bench_core::{ProbeMode, SamplingParams};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default per-probe timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration validation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// A required configuration field is missing.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The base URL is not an http(s) URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// A timeout value is out of acceptable range.
    #[error("invalid timeout: {0:?}")]
    InvalidTimeout(Duration),
}

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for creating an OpenAI-compatible probe client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint base URL, with or without a trailing `/v1`
    pub base_url: String,

    /// Bearer token
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Per-probe timeout
    #[serde(default = "default_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Delivery mode shared by every probe
    #[serde(default)]
    pub mode: ProbeMode,

    /// Override for the mode's default completion budget
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Override for the default sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Append a visible placeholder for every unparsable stream frame
    #[serde(default)]
    pub mark_malformed: bool,

    /// Connection pool settings
    #[serde(skip)]
    pub http: HttpConfig,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl ClientConfig {
    /// Create a new client config for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            mode: ProbeMode::default(),
            max_tokens: None,
            temperature: None,
            mark_malformed: false,
            http: HttpConfig::default(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the per-probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the delivery mode.
    pub fn with_mode(mut self, mode: ProbeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the completion budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Mark unparsable stream frames in the output text.
    pub fn with_malformed_markers(mut self, enabled: bool) -> Self {
        self.mark_malformed = enabled;
        self
    }

    /// Sampling parameters after applying overrides to the mode defaults.
    pub fn params(&self) -> SamplingParams {
        let defaults = SamplingParams::for_mode(self.mode);
        SamplingParams {
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
        }
    }

    /// Base URL without surrounding whitespace, trailing slashes or `/v1`.
    pub fn normalized_base_url(&self) -> String {
        normalize_base_url(&self.base_url)
    }

    /// `GET` target for the model list.
    pub fn models_url(&self) -> String {
        format!("{}/v1/models", self.normalized_base_url())
    }

    /// `POST` target for chat completions.
    pub fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.normalized_base_url())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let base = self.normalized_base_url();
        if base.is_empty() {
            return Err(ConfigValidationError::MissingField("base_url"));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigValidationError::InvalidBaseUrl(self.base_url.clone()));
        }

        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ConfigValidationError::MissingField("api_key"));
        }

        if self.timeout.is_zero() {
            return Err(ConfigValidationError::InvalidTimeout(self.timeout));
        }

        Ok(())
    }
}

/// Trim whitespace and trailing slashes, and drop a trailing `/v1`.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

// ============================================================================
// HTTP Client Pool
// ============================================================================

/// Configuration for the HTTP client pool.
///
/// There is no request-level timeout here: the probe timeout is enforced
/// around each exchange so that it also covers idle gaps in a stream.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Idle connection timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// TCP keepalive interval
    pub tcp_keepalive: Option<Duration>,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            connect_timeout: Duration::from_secs(30),
            tcp_keepalive: Some(Duration::from_secs(60)),
            user_agent: format!("probe-bench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Create config with custom pool size.
    pub fn with_pool_max_idle(mut self, max_idle: usize) -> Self {
        self.pool_max_idle_per_host = max_idle;
        self
    }
}

/// Shared HTTP client with connection pooling.
///
/// One pool serves every worker in a batch; `reqwest::Client` is cheap to
/// clone and reuses idle connections to the same host.
#[derive(Debug, Clone)]
pub struct HttpClientPool {
    /// The underlying reqwest client
    client: Client,

    /// Configuration used to create this pool
    config: HttpConfig,
}

impl HttpClientPool {
    /// Create a new HTTP client pool with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);

        if let Some(keepalive) = config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Get a reference to the underlying HTTP client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get the configuration for this pool.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}
