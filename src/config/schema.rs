//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the file server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// How many reverse-proxy hops in front of us are trusted when
    /// resolving the client address from `X-Forwarded-For`.
    /// Takes effect without restart when the config file changes.
    pub trusted_proxies: usize,

    /// Virtual roots mapping URL prefixes to directories.
    pub roots: Vec<RootConfig>,

    /// Address filtering rules.
    pub geo: GeoConfig,

    /// Rate limiting configuration.
    pub throttle: ThrottleConfig,

    /// Response compression negotiation.
    pub compression: CompressionConfig,

    /// API mount point.
    pub api: ApiConfig,

    /// Account storage and seeding.
    pub accounts: AccountsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// A virtual root: an externally visible URL prefix mapped to a directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RootConfig {
    /// URL prefix, e.g. "/share". "/" serves as the default root.
    pub prefix: String,

    /// Directory the prefix maps to.
    pub path: PathBuf,
}

/// Address filtering. Prefix lists hold exact IPs or `addr/len` prefixes.
/// When `allow` is non-empty, only matching addresses pass; `block` always
/// rejects. Country-level filtering plugs in behind the same gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GeoConfig {
    pub enabled: bool,
    pub allow: Vec<String>,
    pub block: Vec<String>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub enabled: bool,

    /// Sustained requests per second per client.
    pub requests_per_sec: f64,

    /// Burst size (bucket capacity).
    pub burst: f64,

    /// Upper bound on requests being processed at once, 0 = unlimited.
    pub max_active: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_sec: 20.0,
            burst: 40.0,
            max_active: 0,
        }
    }
}

/// Compression negotiation settings. The codec itself is pluggable; this
/// only controls whether the pipeline negotiates an encoding at all.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,

    /// Bodies smaller than this are never compressed.
    pub min_bytes: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self { enabled: true, min_bytes: 1024 }
    }
}

/// API mount point configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Path prefix API calls live under.
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { prefix: "/~/api".to_string() }
    }
}

/// Account storage and seeding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Credential store file (JSON).
    pub file: PathBuf,

    /// Session lifetime in seconds.
    pub session_ttl_secs: u64,

    /// Accounts created on startup if missing from the store. The plaintext
    /// only ever exists in the config file the operator wrote; the store
    /// receives a salt/verifier pair.
    pub seed: Vec<SeedAccount>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("accounts.json"),
            session_ttl_secs: 24 * 60 * 60,
            seed: Vec::new(),
        }
    }
}

/// An account seeded at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedAccount {
    pub username: String,
    pub password: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
