//! Configuration types for order-batch-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};
use utoipa::ToSchema;

/// Environment variable naming an optional JSON configuration file
pub const CONFIG_FILE_ENV: &str = "ORDER_BATCH_DL_CONFIG";

/// Upstream order/asset API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API (default: "https://api.autoenhance.ai/v3")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `x-api-key` (requests are sent without it when unset)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Ceiling for each upstream call, including redirects (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout: default_request_timeout(),
        }
    }
}

/// Batch download behavior (concurrency, limits, archive spill)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchConfig {
    /// Maximum in-flight asset downloads per batch (default: 5)
    ///
    /// The permit pool belongs to a single batch. Two concurrent batches
    /// each get their own permits.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Maximum number of assets a single order may resolve to (default: 100)
    #[serde(default = "default_max_assets")]
    pub max_assets_per_order: usize,

    /// Archive size at which the in-progress archive moves from memory to a
    /// temporary file (default: 10 MiB)
    #[serde(default = "default_spill_threshold")]
    pub spill_threshold_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent(),
            max_assets_per_order: default_max_assets(),
            spill_threshold_bytes: default_spill_threshold(),
        }
    }
}

/// Retry configuration for transient asset download failures
///
/// The defaults give a single retry after a fixed one second pause.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 1 second)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0, fixed backoff)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Exposed server configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerConfig {
    /// REST API server configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Main configuration for order-batch-dl
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Upstream order/asset API
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Batch download behavior
    #[serde(default)]
    pub batch: BatchConfig,

    /// Retry policy for asset downloads
    #[serde(default)]
    pub retry: RetryConfig,

    /// Exposed REST API
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration for the service binary
    ///
    /// Reads the JSON file named by [`CONFIG_FILE_ENV`] when set, then applies
    /// environment overrides and validates the result.
    pub fn load() -> Result<Self> {
        let base = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
            key: None,
        })
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("UPSTREAM_BASE_URL") {
            self.upstream.base_url = url;
        }
        if let Some(key) = lookup("UPSTREAM_API_KEY").filter(|k| !k.is_empty()) {
            self.upstream.api_key = Some(key);
        }
        if let Some(secs) = lookup("UPSTREAM_TIMEOUT_SECS") {
            self.upstream.request_timeout =
                Duration::from_secs(parse_var("UPSTREAM_TIMEOUT_SECS", &secs)?);
        }
        if let Some(n) = lookup("MAX_CONCURRENT_DOWNLOADS") {
            self.batch.max_concurrent_downloads = parse_var("MAX_CONCURRENT_DOWNLOADS", &n)?;
        }
        if let Some(n) = lookup("MAX_ASSETS_PER_ORDER") {
            self.batch.max_assets_per_order = parse_var("MAX_ASSETS_PER_ORDER", &n)?;
        }
        if let Some(n) = lookup("SPILL_THRESHOLD_BYTES") {
            self.batch.spill_threshold_bytes = parse_var("SPILL_THRESHOLD_BYTES", &n)?;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.server.api.bind_address = parse_var("BIND_ADDRESS", &addr)?;
        }
        if let Some(key) = lookup("API_KEY").filter(|k| !k.is_empty()) {
            self.server.api.api_key = Some(key);
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.api.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(flag) = lookup("SWAGGER_UI") {
            self.server.api.swagger_ui = parse_var("SWAGGER_UI", &flag)?;
        }
        Ok(self)
    }

    /// Check that the configuration can drive a batch
    pub fn validate(&self) -> Result<()> {
        if self.batch.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("batch.max_concurrent_downloads".to_string()),
            });
        }
        if self.batch.max_assets_per_order == 0 {
            return Err(Error::Config {
                message: "max_assets_per_order must be at least 1".to_string(),
                key: Some("batch.max_assets_per_order".to_string()),
            });
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::Config {
                message: format!(
                    "backoff_multiplier must be a finite number >= 1.0, got {multiplier}"
                ),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        if let Err(e) = url::Url::parse(&self.upstream.base_url) {
            return Err(Error::Config {
                message: format!("invalid upstream base URL '{}': {}", self.upstream.base_url, e),
                key: Some("upstream.base_url".to_string()),
            });
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| Error::Config {
        message: format!("invalid value '{}' for {}: {}", value, key, e),
        key: Some(key.to_string()),
    })
}

// Default value functions
fn default_base_url() -> String {
    "https://api.autoenhance.ai/v3".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent() -> usize {
    5
}

fn default_max_assets() -> usize {
    100
}

fn default_spill_threshold() -> usize {
    10 * 1024 * 1024
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
