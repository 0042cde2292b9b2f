//! # platform_core
//!
//! Email platform detection engine. Given a domain, it gathers public signals
//! and resolves them into the email/webmail platform the domain runs on.
//!
//! ## Features
//!
//! - **DNS signals** (MX, SPF, DKIM, autodiscover SRV) via hickory-resolver
//! - **Control-panel port probing** over plain TCP connects
//! - **Webmail endpoint race** across well-known login paths
//! - **WHOIS keyword matching** as a last-resort heuristic
//! - **TTL result cache** with an LRU bound, injectable for tests
//! - **Weighted scoring** as an independent secondary ranking
//!
//! ## Example
//!
//! ```rust,no_run
//! use platform_core::{DetectionConfig, DetectionEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = DetectionEngine::new(DetectionConfig::default())?;
//!
//!     let result = engine.detect("example.com").await;
//!     println!("{} -> {}", result.platform, result.page_key);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod detection_pipeline;
pub mod dns;
pub mod http_probe;
pub mod knowledge_base;
pub mod port_probe;
pub mod scoring;
pub mod whois;

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;

/// Configuration for the detection engine
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// DNS resolver timeout in milliseconds
    pub dns_timeout_ms: u64,
    /// Maximum number of DNS lookup attempts
    pub dns_attempts: usize,
    /// Resolver-level DNS cache size (number of entries)
    pub dns_cache_size: usize,
    /// Minimum TTL for positive DNS cache entries
    pub dns_min_ttl_secs: u64,
    /// DKIM selectors probed under `{selector}._domainkey.{domain}`
    pub dkim_selectors: Vec<String>,
    /// Ports whose reachability marks a control-panel webmail host
    pub control_panel_ports: Vec<u16>,
    /// TCP connect timeout for port probes in milliseconds
    pub port_timeout_ms: u64,
    /// Per-request timeout for webmail endpoint probes in milliseconds
    pub http_timeout_ms: u64,
    /// Upper bound on a whole WHOIS exchange in milliseconds
    pub whois_timeout_ms: u64,
    /// How long a detection result stays valid in the cache
    pub cache_ttl_secs: u64,
    /// Maximum number of cached domains
    pub cache_capacity: usize,
    /// Race well-known webmail paths over HTTP(S)
    pub enable_http_probe: bool,
    /// Fall back to WHOIS text when technical signals are silent
    pub enable_whois: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            dns_timeout_ms: 2000,
            dns_attempts: 2,
            dns_cache_size: 10_000,
            dns_min_ttl_secs: 60,
            dkim_selectors: dns::DEFAULT_DKIM_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            control_panel_ports: port_probe::CONTROL_PANEL_PORTS.to_vec(),
            port_timeout_ms: 3000,
            http_timeout_ms: 3000,
            whois_timeout_ms: 5000,
            cache_ttl_secs: 300,
            cache_capacity: 10_000,
            enable_http_probe: true,
            enable_whois: true,
        }
    }
}

/// A DKIM selector that answered with a TXT record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkimSelector {
    pub selector: String,
    pub record: String,
}

/// Complete detection result for a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// The domain that was inspected, as given by the caller
    pub domain: String,
    /// Resolved platform id, `fallback` when nothing matched
    pub platform: String,
    /// Page key derived from `platform`; always a known key
    pub page_key: String,
    /// MX exchange hostnames, lowercased, in resolver order
    pub mx_hosts: Vec<String>,
    /// TXT records carrying an SPF policy
    pub spf_txts: Vec<String>,
    /// DKIM selectors that resolved
    pub dkim_selectors: Vec<DkimSelector>,
    /// Match tag of the webmail endpoint that answered 200
    pub webmail_path: Option<String>,
    /// Platform matched in WHOIS text
    pub whois_match: Option<String>,
    /// Platform derived from the autodiscover SRV record
    pub autodiscover_match: Option<String>,
    /// Failure tag when detection aborted
    pub error: Option<String>,
    /// When the detection ran
    pub detected_at: SystemTime,
}

impl DetectionResult {
    /// A fresh result that resolves to the fallback platform
    pub fn fallback(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            platform: knowledge_base::FALLBACK_PLATFORM.to_string(),
            page_key: knowledge_base::FALLBACK_PAGE_KEY.to_string(),
            mx_hosts: Vec::new(),
            spf_txts: Vec::new(),
            dkim_selectors: Vec::new(),
            webmail_path: None,
            whois_match: None,
            autodiscover_match: None,
            error: None,
            detected_at: SystemTime::now(),
        }
    }

    /// Whether no tier has assigned a platform yet
    pub fn is_fallback(&self) -> bool {
        self.platform == knowledge_base::FALLBACK_PLATFORM
    }
}

/// Errors that can occur during detection
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("DNS resolution failed: {0}")]
    DnsResolutionFailed(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DetectionError>;

// Re-export main types
pub use cache::{DetectionCache, TtlCache};
pub use detection_pipeline::{Collectors, DetectionEngine, EngineStats};
pub use scoring::{score, PlatformScores};
