//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Backing store connection settings.
    pub database: ConnectionConfig,

    /// Connect retry policy.
    pub retries: RetryConfig,

    /// Per-caller admission control.
    pub admission: AdmissionConfig,

    /// Health surface listener.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Everything needed to open a connection to the backing store.
///
/// Required fields are optional at the type level so a partially configured
/// process can still start; the missing values are reported at load time
/// and every acquisition fails fast until they are supplied.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Principal to authenticate as.
    pub user: Option<String>,

    /// Credential for the principal.
    pub password: Option<String>,

    /// Network host of the store.
    pub host: Option<String>,

    /// Network port of the store.
    pub port: u16,

    /// Target database (namespace).
    pub database: Option<String>,

    /// Per-attempt connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Transport security. Absent means plaintext.
    pub tls: Option<TlsConfig>,
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            host: None,
            port: 5432,
            database: None,
            connect_timeout_ms: 10_000,
            tls: None,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

/// Trust anchor for verified TLS to the store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Inline PEM block, or a path to a PEM file.
    pub ca_cert: String,
}

/// Where the trust anchor material comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaSource<'a> {
    Pem(&'a str),
    Path(&'a str),
}

impl TlsConfig {
    pub fn source(&self) -> CaSource<'_> {
        let trimmed = self.ca_cert.trim_start();
        if trimmed.starts_with("-----BEGIN") {
            CaSource::Pem(trimmed)
        } else {
            CaSource::Path(self.ca_cert.trim())
        }
    }
}

/// Retry configuration for connection acquisition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total connect attempts before giving up.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 5_000,
        }
    }
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Operations admitted per key within one window.
    pub capacity: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Upper bound on tracked keys before least-recently-used eviction.
    pub max_keys: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            window_ms: 60_000,
            max_keys: 10_000,
        }
    }
}

/// Health surface listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
