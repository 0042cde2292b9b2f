//! Configuration management for the platform detection API
//!
//! This module handles loading configuration from environment variables
//! and configuration files using the figment crate.

use platform_core::DetectionConfig;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub detection: DetectionSettings,
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Detection engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// DNS resolver timeout in milliseconds
    pub dns_timeout_ms: u64,
    /// Maximum number of DNS lookup attempts
    pub dns_attempts: usize,
    /// Resolver-level DNS cache size (number of entries)
    pub dns_cache_size: usize,
    /// Minimum TTL for positive DNS cache entries in seconds
    pub dns_min_ttl_secs: u64,
    /// DKIM selectors to probe
    pub dkim_selectors: Vec<String>,
    /// Control-panel webmail ports
    pub control_panel_ports: Vec<u16>,
    /// TCP port probe timeout in milliseconds
    pub port_timeout_ms: u64,
    /// Webmail endpoint probe timeout in milliseconds
    pub http_timeout_ms: u64,
    /// WHOIS lookup timeout in milliseconds
    pub whois_timeout_ms: u64,
    /// Detection result cache TTL in seconds
    pub cache_ttl_secs: u64,
    /// Maximum number of cached domains
    pub cache_capacity: usize,
    /// Enable the webmail endpoint race
    pub enable_http_probe: bool,
    /// Enable the WHOIS fallback tier
    pub enable_whois: bool,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        let core = DetectionConfig::default();
        Self {
            dns_timeout_ms: core.dns_timeout_ms,
            dns_attempts: core.dns_attempts,
            dns_cache_size: core.dns_cache_size,
            dns_min_ttl_secs: core.dns_min_ttl_secs,
            dkim_selectors: core.dkim_selectors,
            control_panel_ports: core.control_panel_ports,
            port_timeout_ms: core.port_timeout_ms,
            http_timeout_ms: core.http_timeout_ms,
            whois_timeout_ms: core.whois_timeout_ms,
            cache_ttl_secs: core.cache_ttl_secs,
            cache_capacity: core.cache_capacity,
            enable_http_probe: core.enable_http_probe,
            enable_whois: core.enable_whois,
        }
    }
}

impl From<DetectionSettings> for DetectionConfig {
    fn from(settings: DetectionSettings) -> Self {
        Self {
            dns_timeout_ms: settings.dns_timeout_ms,
            dns_attempts: settings.dns_attempts,
            dns_cache_size: settings.dns_cache_size,
            dns_min_ttl_secs: settings.dns_min_ttl_secs,
            dkim_selectors: settings.dkim_selectors,
            control_panel_ports: settings.control_panel_ports,
            port_timeout_ms: settings.port_timeout_ms,
            http_timeout_ms: settings.http_timeout_ms,
            whois_timeout_ms: settings.whois_timeout_ms,
            cache_ttl_secs: settings.cache_ttl_secs,
            cache_capacity: settings.cache_capacity,
            enable_http_probe: settings.enable_http_probe,
            enable_whois: settings.enable_whois,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable JSON structured logging
    pub json_logs: bool,
    /// Log filter used when RUST_LOG is not set
    pub log_level: String,
    /// Metrics namespace
    pub metrics_namespace: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: "info".to_string(),
            metrics_namespace: "platform_detector".to_string(),
        }
    }
}

/// Environment variable names for configuration
///
/// Nested keys are separated by a double underscore.
#[allow(dead_code)]
pub mod env_vars {
    pub const PREFIX: &str = "PLATFORM_API_";
    pub const SERVER_HOST: &str = "PLATFORM_API_SERVER__HOST";
    pub const SERVER_PORT: &str = "PLATFORM_API_SERVER__PORT";
    pub const DNS_TIMEOUT_MS: &str = "PLATFORM_API_DETECTION__DNS_TIMEOUT_MS";
    pub const CACHE_TTL_SECS: &str = "PLATFORM_API_DETECTION__CACHE_TTL_SECS";
    pub const ENABLE_HTTP_PROBE: &str = "PLATFORM_API_DETECTION__ENABLE_HTTP_PROBE";
    pub const ENABLE_WHOIS: &str = "PLATFORM_API_DETECTION__ENABLE_WHOIS";
    pub const JSON_LOGS: &str = "PLATFORM_API_OBSERVABILITY__JSON_LOGS";
    pub const LOG_LEVEL: &str = "PLATFORM_API_OBSERVABILITY__LOG_LEVEL";
}
