//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML config files.
//! Every section has defaults so a minimal config (just pools) is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream pool definitions, in routing order. First match wins.
    pub pools: Vec<PoolConfig>,

    /// Forwarding and retry settings.
    pub proxy: ProxySettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Forwarding and retry settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Wall-clock budget for the per-request retry loop, in seconds.
    pub retry_budget_secs: u64,

    /// Cap on the inbound body buffered for retransmission, in bytes.
    pub max_buffer_bytes: usize,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            retry_budget_secs: 60,
            max_buffer_bytes: 2 * 1024 * 1024,
        }
    }
}

/// One upstream pool: a route prefix, a selection policy, and its backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Path prefix this pool is routed on (e.g., "/api").
    pub from: String,

    /// Selection policy: "round_robin" (default), "random", or "least_conn".
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Backend servers, in order.
    pub backends: Vec<BackendConfig>,
}

fn default_policy() -> String {
    "round_robin".to_string()
}

/// One backend server inside a pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base address (e.g., "http://127.0.0.1:3000").
    pub address: String,

    /// Seconds one recorded failure keeps weighing on this backend.
    #[serde(default = "default_fail_timeout")]
    pub fail_timeout_secs: u64,

    /// Extra headers applied to every forwarded request. An array of tables
    /// keeps the operator-defined order; values are templates resolved
    /// against the inbound request.
    #[serde(default)]
    pub extra_headers: Vec<HeaderConfig>,
}

fn default_fail_timeout() -> u64 {
    10
}

/// One extra-header entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderConfig {
    pub name: String,
    pub value: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
