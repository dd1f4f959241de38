//! Configuration management for Warden.

use http::header::HeaderName;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, WardenError};
use crate::ratelimit::{RateLimitAlgorithm, SlidingWindowAlgorithm, DEFAULT_CLIENT_HEADER};

/// Main configuration for the Warden service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Which rate limit algorithm to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    #[default]
    SlidingWindow,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Algorithm used for every endpoint
    #[serde(default)]
    pub algorithm: AlgorithmKind,

    /// Window size in milliseconds, shared by all endpoints
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Header identifying the client
    #[serde(default = "default_client_header")]
    pub client_header: String,

    /// How often idle clients are evicted, in seconds (0 disables)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Per-endpoint limits
    #[serde(default)]
    pub endpoints: Vec<EndpointLimitConfig>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::default(),
            window_ms: default_window_ms(),
            client_header: default_client_header(),
            sweep_interval_secs: default_sweep_interval(),
            endpoints: Vec::new(),
        }
    }
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_client_header() -> String {
    DEFAULT_CLIENT_HEADER.to_string()
}

fn default_sweep_interval() -> u64 {
    30
}

/// A limit for a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointLimitConfig {
    /// Request path, matched exactly
    pub path: String,
    /// Maximum requests per window
    pub limit: u64,
}

impl EndpointLimitConfig {
    pub fn new(path: impl Into<String>, limit: u64) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }
}

impl RateLimitingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Sweep interval, or `None` when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn client_header_name(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.client_header.as_bytes()).map_err(|e| {
            WardenError::Config(format!("Invalid client header '{}': {}", self.client_header, e))
        })
    }

    /// Construct the configured algorithm with every endpoint limit applied.
    pub fn build_algorithm(&self) -> Result<Arc<dyn RateLimitAlgorithm>> {
        let algorithm: Arc<dyn RateLimitAlgorithm> = match self.algorithm {
            AlgorithmKind::SlidingWindow => Arc::new(SlidingWindowAlgorithm::new(self.window())),
        };

        for endpoint in &self.endpoints {
            algorithm.set_endpoint_limit(&endpoint.path, endpoint.limit)?;
        }

        info!(
            algorithm = ?self.algorithm,
            window_ms = self.window_ms,
            endpoints = self.endpoints.len(),
            "Rate limit algorithm initialized"
        );
        Ok(algorithm)
    }
}

impl WardenConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WardenConfig = serde_yaml::from_str(yaml)
            .map_err(|e| WardenError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// The limits the stock demo server runs with.
    pub fn demo() -> Self {
        let mut config = Self::default();
        config.rate_limiting.endpoints = vec![
            EndpointLimitConfig::new("/api/user", 3),
            EndpointLimitConfig::new("/api/profile", 4),
        ];
        config
    }

    /// Reject settings that would silently allow or deny everything.
    pub fn validate(&self) -> Result<()> {
        let rate_limiting = &self.rate_limiting;

        if rate_limiting.window_ms == 0 {
            return Err(WardenError::Config("window_ms must be greater than zero".to_string()));
        }

        for endpoint in &rate_limiting.endpoints {
            if endpoint.limit == 0 {
                return Err(WardenError::Config(format!(
                    "limit for endpoint '{}' must be greater than zero",
                    endpoint.path
                )));
            }
            if !endpoint.path.starts_with('/') {
                return Err(WardenError::Config(format!(
                    "endpoint path '{}' must start with '/'",
                    endpoint.path
                )));
            }
        }

        rate_limiting.client_header_name()?;
        Ok(())
    }
}
