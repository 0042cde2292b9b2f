//! Resolution engine orchestrating all platform signals
//!
//! Collectors run in a fixed order, cheapest first. DNS keywords set a
//! tentative platform, an open control-panel port or a webmail login page
//! overrides it unconditionally, and WHOIS text and autodiscover SRV only fill
//! in when nothing else matched.

use crate::{
    cache::{DetectionCache, TtlCache},
    dns::{DnsCollector, DnsResolver},
    http_probe::{self, HttpWebmailProbe, WebmailProbe},
    knowledge_base::{self, CONTROL_PANEL_PLATFORM},
    port_probe::{self, PortProbe, TcpPortProbe},
    scoring::{self, PlatformScores},
    whois::{WhoisClient, WhoisCollector},
    DetectionConfig, DetectionError, DetectionResult,
};

use anyhow::Context;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument, warn};

/// Error tag recorded when the MX lookup fails
pub const DNS_FAILURE_TAG: &str = "DNS resolution failed";

/// Signal sources used by the engine
pub struct Collectors {
    pub dns: Arc<dyn DnsCollector>,
    pub ports: Arc<dyn PortProbe>,
    pub webmail: Arc<dyn WebmailProbe>,
    pub whois: Arc<dyn WhoisCollector>,
}

impl Collectors {
    /// Network-backed collectors built from configuration
    pub fn from_config(config: &DetectionConfig) -> crate::Result<Self> {
        let dns = DnsResolver::new(
            config.dns_timeout_ms,
            config.dns_attempts,
            config.dns_cache_size,
            config.dns_min_ttl_secs,
            config.dkim_selectors.clone(),
        )
        .context("Failed to initialize DNS resolver")?;

        let webmail = HttpWebmailProbe::new(config.http_timeout_ms)
            .context("Failed to initialize webmail probe")?;

        Ok(Self {
            dns: Arc::new(dns),
            ports: Arc::new(TcpPortProbe::new(config.port_timeout_ms)),
            webmail: Arc::new(webmail),
            whois: Arc::new(WhoisClient::new(config.whois_timeout_ms)),
        })
    }
}

/// Main detection engine
pub struct DetectionEngine {
    config: DetectionConfig,
    collectors: Collectors,
    cache: Arc<dyn DetectionCache>,
    /// Per-domain locks so concurrent requests for one domain probe once
    in_flight: InFlightMap,
    detections: AtomicU64,
    cache_hits: AtomicU64,
    dns_failures: AtomicU64,
}

impl DetectionEngine {
    /// Create an engine with network-backed collectors and a TTL cache
    ///
    /// # Returns
    /// * `Ok(DetectionEngine)` on success
    /// * `Err(DetectionError)` if the configuration is unusable or a collector fails to start
    pub fn new(config: DetectionConfig) -> crate::Result<Self> {
        info!("Initializing detection engine");

        validate_config(&config)?;

        let collectors = Collectors::from_config(&config)?;
        let cache = Arc::new(TtlCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        ));

        info!(
            "Detection engine initialized - {} platforms, cache ttl {}s, capacity {}",
            knowledge_base::platform_count(),
            config.cache_ttl_secs,
            config.cache_capacity
        );

        Ok(Self::with_parts(config, collectors, cache))
    }

    /// Assemble an engine from explicit collectors and cache
    pub fn with_parts(
        config: DetectionConfig,
        collectors: Collectors,
        cache: Arc<dyn DetectionCache>,
    ) -> Self {
        Self {
            config,
            collectors,
            cache,
            in_flight: DashMap::new(),
            detections: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            dns_failures: AtomicU64::new(0),
        }
    }

    /// Detect the email platform behind a domain
    ///
    /// Never fails: a DNS failure is reported through `DetectionResult::error`
    /// with the platform left at the fallback value.
    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn detect(&self, domain: &str) -> DetectionResult {
        self.detections.fetch_add(1, Ordering::Relaxed);

        if let Some(cached) = self.cached(domain) {
            return cached;
        }

        let entry = InFlight::join(&self.in_flight, domain);
        let _guard = entry.lock.lock().await;

        // Another request may have finished this domain while we waited
        match self.cached(domain) {
            Some(cached) => cached,
            None => self.resolve(domain).await,
        }
    }

    /// Weighted ranking of the signals in a detection result
    pub fn score(&self, result: &DetectionResult) -> PlatformScores {
        let dkim: Vec<&str> = result
            .dkim_selectors
            .iter()
            .map(|dkim| dkim.record.as_str())
            .collect();
        scoring::score(&as_strs(&result.mx_hosts), &as_strs(&result.spf_txts), &dkim)
    }

    fn cached(&self, domain: &str) -> Option<DetectionResult> {
        let cached = self.cache.lookup(domain)?;
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        debug!("Cache hit for {}: {}", domain, cached.platform);
        Some(cached)
    }

    /// Run every tier for a cache miss
    async fn resolve(&self, domain: &str) -> DetectionResult {
        debug!("Starting platform detection for: {}", domain);
        let mut result = DetectionResult::fallback(domain);

        // Tier 1: DNS records, first keyword match wins
        let signals = match self.collectors.dns.collect(domain).await {
            Ok(signals) => signals,
            Err(e) => {
                warn!("Detection aborted for {}: {}", domain, e);
                self.dns_failures.fetch_add(1, Ordering::Relaxed);
                result.error = Some(DNS_FAILURE_TAG.to_string());
                return result;
            }
        };

        if let Some(platform) = knowledge_base::match_keywords(&signals.signal_text()) {
            debug!("DNS signals match {}", platform);
            result.platform = platform.to_string();
        }

        result.mx_hosts = signals.mx_hosts;
        result.spf_txts = signals.spf_txts;
        result.dkim_selectors = signals.dkim_selectors;
        result.autodiscover_match = signals.autodiscover;

        // Tier 2: control-panel ports override DNS
        let open_port = port_probe::first_open_port(
            self.collectors.ports.as_ref(),
            domain,
            &self.config.control_panel_ports,
        )
        .await;
        if let Some(port) = open_port {
            debug!("Control-panel port {} open on {}", port, domain);
            result.platform = CONTROL_PANEL_PLATFORM.to_string();
        }

        // Tier 3: webmail login page overrides everything above
        if self.config.enable_http_probe {
            if let Some(indicator) = self.collectors.webmail.probe_webmail(domain).await {
                if let Some(platform) = http_probe::platform_for_indicator(&indicator) {
                    debug!("Webmail indicator {} maps to {}", indicator, platform);
                    result.platform = platform.to_string();
                }
                result.webmail_path = Some(indicator);
            }
        }

        // Tier 4: WHOIS text, only when nothing technical matched
        if self.config.enable_whois && result.is_fallback() {
            result.whois_match = self.collectors.whois.collect(domain).await;
            if let Some(platform) = &result.whois_match {
                debug!("WHOIS text matches {}", platform);
                result.platform = platform.clone();
            }
        }

        // Tier 5: autodiscover SRV as the last resort
        if result.is_fallback() {
            if let Some(platform) = &result.autodiscover_match {
                debug!("Autodiscover SRV points to {}", platform);
                result.platform = platform.clone();
            }
        }

        result.page_key = knowledge_base::page_key(&result.platform).to_string();
        result.detected_at = SystemTime::now();

        info!("Detected platform for {}: {} (page {})", domain, result.platform, result.page_key);

        self.cache.store(domain, result.clone());
        result
    }

    /// Get engine statistics for monitoring
    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            known_platforms: knowledge_base::platform_count(),
            cached_domains: self.cache.len(),
            detections_total: self.detections.load(Ordering::Relaxed),
            cache_hits_total: self.cache_hits.load(Ordering::Relaxed),
            dns_failures_total: self.dns_failures.load(Ordering::Relaxed),
        }
    }

    /// Drop every cached detection result and the resolver's DNS cache
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.collectors.dns.clear_cache();
        info!("Detection cache cleared");
    }
}

type InFlightMap = DashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// One caller's claim on a domain's in-flight lock
///
/// Dropping it, on completion or when the `detect` future is cancelled,
/// removes the map entry once no other caller still holds the lock.
struct InFlight<'a> {
    map: &'a InFlightMap,
    domain: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn join(map: &'a InFlightMap, domain: &'a str) -> Self {
        let lock = map
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        Self { map, domain, lock }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        // One reference in the map and one here: nobody else is waiting
        self.map
            .remove_if(self.domain, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

/// Statistics about the detection engine
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineStats {
    pub known_platforms: usize,
    pub cached_domains: usize,
    pub detections_total: u64,
    pub cache_hits_total: u64,
    pub dns_failures_total: u64,
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn validate_config(config: &DetectionConfig) -> crate::Result<()> {
    if config.cache_capacity == 0 {
        return Err(DetectionError::ConfigurationError(
            "cache_capacity must be greater than zero".to_string(),
        ));
    }
    if config.port_timeout_ms == 0 || config.http_timeout_ms == 0 || config.whois_timeout_ms == 0 {
        return Err(DetectionError::ConfigurationError(
            "probe timeouts must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::DnsSignals;
    use crate::DkimSelector;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Call counts shared by every fake collector
    #[derive(Default)]
    struct Calls {
        dns: AtomicUsize,
        dns_clears: AtomicUsize,
        ports: AtomicUsize,
        webmail: AtomicUsize,
        whois: AtomicUsize,
    }

    struct FakeDns {
        signals: Option<DnsSignals>,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl DnsCollector for FakeDns {
        async fn collect(&self, _domain: &str) -> crate::Result<DnsSignals> {
            self.calls.dns.fetch_add(1, Ordering::SeqCst);
            // Give concurrent callers a chance to pile up behind the lock
            tokio::task::yield_now().await;
            self.signals
                .clone()
                .ok_or_else(|| DetectionError::DnsResolutionFailed("NXDOMAIN".to_string()))
        }

        fn clear_cache(&self) {
            self.calls.dns_clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// DNS that never answers, to hold `detect` mid-flight
    struct StalledDns;

    #[async_trait]
    impl DnsCollector for StalledDns {
        async fn collect(&self, _domain: &str) -> crate::Result<DnsSignals> {
            std::future::pending().await
        }
    }

    struct FakePorts {
        open: Vec<u16>,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl PortProbe for FakePorts {
        async fn probe(&self, _domain: &str, port: u16) -> bool {
            self.calls.ports.fetch_add(1, Ordering::SeqCst);
            self.open.contains(&port)
        }
    }

    struct FakeWebmail {
        indicator: Option<String>,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl WebmailProbe for FakeWebmail {
        async fn probe_webmail(&self, _domain: &str) -> Option<String> {
            self.calls.webmail.fetch_add(1, Ordering::SeqCst);
            self.indicator.clone()
        }
    }

    struct FakeWhois {
        text: Option<String>,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl WhoisCollector for FakeWhois {
        async fn collect(&self, _domain: &str) -> Option<String> {
            self.calls.whois.fetch_add(1, Ordering::SeqCst);
            self.text
                .as_deref()
                .and_then(crate::whois::match_whois_text)
                .map(str::to_string)
        }
    }

    /// Builder for an engine wired to fake collectors
    struct Scenario {
        signals: Option<DnsSignals>,
        open_ports: Vec<u16>,
        webmail: Option<String>,
        whois_text: Option<String>,
        ttl: Duration,
    }

    impl Scenario {
        fn new() -> Self {
            Self {
                signals: Some(DnsSignals {
                    mx_hosts: vec!["mail.example.org".to_string()],
                    ..Default::default()
                }),
                open_ports: Vec::new(),
                webmail: None,
                whois_text: None,
                ttl: Duration::from_secs(300),
            }
        }

        fn mx(mut self, hosts: &[&str]) -> Self {
            self.signals.get_or_insert_with(DnsSignals::default).mx_hosts =
                hosts.iter().map(|h| h.to_string()).collect();
            self
        }

        fn spf(mut self, records: &[&str]) -> Self {
            self.signals.get_or_insert_with(DnsSignals::default).spf_txts =
                records.iter().map(|r| r.to_string()).collect();
            self
        }

        fn dkim(mut self, selector: &str, record: &str) -> Self {
            self.signals
                .get_or_insert_with(DnsSignals::default)
                .dkim_selectors
                .push(DkimSelector {
                    selector: selector.to_string(),
                    record: record.to_string(),
                });
            self
        }

        fn autodiscover(mut self, platform: &str) -> Self {
            self.signals.get_or_insert_with(DnsSignals::default).autodiscover =
                Some(platform.to_string());
            self
        }

        fn nxdomain(mut self) -> Self {
            self.signals = None;
            self
        }

        fn open_ports(mut self, ports: &[u16]) -> Self {
            self.open_ports = ports.to_vec();
            self
        }

        fn webmail(mut self, indicator: &str) -> Self {
            self.webmail = Some(indicator.to_string());
            self
        }

        fn whois(mut self, text: &str) -> Self {
            self.whois_text = Some(text.to_string());
            self
        }

        fn build(self) -> (DetectionEngine, Arc<Calls>) {
            let calls = Arc::new(Calls::default());
            let collectors = Collectors {
                dns: Arc::new(FakeDns { signals: self.signals, calls: calls.clone() }),
                ports: Arc::new(FakePorts { open: self.open_ports, calls: calls.clone() }),
                webmail: Arc::new(FakeWebmail { indicator: self.webmail, calls: calls.clone() }),
                whois: Arc::new(FakeWhois { text: self.whois_text, calls: calls.clone() }),
            };
            let cache = Arc::new(TtlCache::new(self.ttl, 100));
            let engine = DetectionEngine::with_parts(DetectionConfig::default(), collectors, cache);
            (engine, calls)
        }
    }

    #[tokio::test]
    async fn test_google_end_to_end() {
        let (engine, _) = Scenario::new()
            .mx(&["aspmx.l.google.com"])
            .spf(&["v=spf1 include:_spf.google.com ~all"])
            .build();

        let result = engine.detect("example.com").await;
        assert_eq!(result.platform, "google");
        assert_eq!(result.page_key, "gmail");
        assert_eq!(result.error, None);
        assert_eq!(result.mx_hosts, vec!["aspmx.l.google.com"]);
    }

    #[tokio::test]
    async fn test_no_signals_resolves_to_fallback() {
        let (engine, calls) = Scenario::new().build();

        let result = engine.detect("example.org").await;
        assert_eq!(result.platform, knowledge_base::FALLBACK_PLATFORM);
        assert_eq!(result.page_key, knowledge_base::FALLBACK_PAGE_KEY);
        assert_eq!(result.error, None);
        assert_eq!(calls.whois.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dns_failure_short_circuits() {
        let (engine, calls) = Scenario::new().nxdomain().open_ports(&[2095]).build();

        let result = engine.detect("missing.example").await;
        assert_eq!(result.error.as_deref(), Some(DNS_FAILURE_TAG));
        assert_eq!(result.platform, knowledge_base::FALLBACK_PLATFORM);
        assert_eq!(result.page_key, knowledge_base::FALLBACK_PAGE_KEY);

        // No later tier ran
        assert_eq!(calls.ports.load(Ordering::SeqCst), 0);
        assert_eq!(calls.webmail.load(Ordering::SeqCst), 0);
        assert_eq!(calls.whois.load(Ordering::SeqCst), 0);

        // Failures are not cached
        engine.detect("missing.example").await;
        assert_eq!(calls.dns.load(Ordering::SeqCst), 2);
        assert_eq!(engine.get_stats().dns_failures_total, 2);
    }

    #[tokio::test]
    async fn test_first_match_follows_knowledge_base_order() {
        // yahoodns.net is shared by yahoo and att
        let (engine, _) = Scenario::new().mx(&["mta7.am0.yahoodns.net"]).build();
        assert_eq!(engine.detect("example.com").await.platform, "yahoo");
    }

    #[tokio::test]
    async fn test_dkim_records_feed_keyword_match() {
        let (engine, _) = Scenario::new()
            .mx(&["mx1.example.net"])
            .dkim("default", "v=DKIM1; k=rsa; p=ABC; n=Zimbra")
            .build();

        let result = engine.detect("example.net").await;
        assert_eq!(result.platform, "zimbra");
        assert_eq!(result.dkim_selectors.len(), 1);
    }

    #[tokio::test]
    async fn test_open_port_overrides_dns_match() {
        for port in [2095, 2096] {
            let (engine, _) = Scenario::new()
                .mx(&["aspmx.l.google.com"])
                .open_ports(&[port])
                .build();

            let result = engine.detect("example.com").await;
            assert_eq!(result.platform, "cpanel", "port {}", port);
            assert_eq!(result.page_key, "cpanel");
        }
    }

    #[tokio::test]
    async fn test_port_probe_stops_at_first_open_port() {
        let (engine, calls) = Scenario::new().open_ports(&[2095, 2096]).build();
        engine.detect("example.com").await;
        assert_eq!(calls.ports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_webmail_overrides_port_and_dns() {
        let (engine, _) = Scenario::new()
            .mx(&["aspmx.l.google.com"])
            .open_ports(&[2096])
            .webmail(http_probe::OWA_TAG)
            .build();

        let result = engine.detect("example.com").await;
        assert_eq!(result.platform, "outlook");
        assert_eq!(result.webmail_path.as_deref(), Some("owa"));
    }

    #[tokio::test]
    async fn test_unmapped_webmail_path_keeps_current_platform() {
        let (engine, _) = Scenario::new()
            .mx(&["mx.zoho.com"])
            .webmail("/mail")
            .build();

        let result = engine.detect("example.com").await;
        assert_eq!(result.platform, "zoho");
        assert_eq!(result.webmail_path.as_deref(), Some("/mail"));
    }

    #[tokio::test]
    async fn test_whois_only_after_other_tiers_miss() {
        let (engine, calls) = Scenario::new()
            .whois("Registrant Organization: Example\nName Server: ns1.zoho.com")
            .build();

        let result = engine.detect("example.com").await;
        assert_eq!(result.platform, "zoho");
        assert_eq!(result.whois_match.as_deref(), Some("zoho"));
        assert_eq!(calls.ports.load(Ordering::SeqCst), 2);
        assert_eq!(calls.webmail.load(Ordering::SeqCst), 1);
        assert_eq!(calls.whois.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_whois_skipped_when_dns_matched() {
        let (engine, calls) = Scenario::new()
            .mx(&["mx.yandex.net"])
            .whois("Name Server: ns1.zoho.com")
            .build();

        let result = engine.detect("example.ru").await;
        assert_eq!(result.platform, "yandex");
        assert_eq!(result.whois_match, None);
        assert_eq!(calls.whois.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_autodiscover_fills_last_gap() {
        let (engine, _) = Scenario::new().autodiscover("outlook").build();
        let result = engine.detect("example.com").await;
        assert_eq!(result.platform, "outlook");
        assert_eq!(result.autodiscover_match.as_deref(), Some("outlook"));

        // WHOIS outranks autodiscover
        let (engine, _) = Scenario::new()
            .autodiscover("outlook")
            .whois("Name Server: ns1.messagingengine.com")
            .build();
        assert_eq!(engine.detect("example.com").await.platform, "fastmail");
    }

    #[tokio::test]
    async fn test_cached_result_is_identical_and_skips_collectors() {
        let (engine, calls) = Scenario::new().mx(&["mx.zoho.com"]).build();

        let first = engine.detect("example.com").await;
        let second = engine.detect("example.com").await;

        assert_eq!(first, second);
        assert_eq!(calls.dns.load(Ordering::SeqCst), 1);
        assert_eq!(calls.ports.load(Ordering::SeqCst), 2);
        assert_eq!(calls.webmail.load(Ordering::SeqCst), 1);

        let stats = engine.get_stats();
        assert_eq!(stats.detections_total, 2);
        assert_eq!(stats.cache_hits_total, 1);
        assert_eq!(stats.cached_domains, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_reruns_collectors() {
        let (engine, calls) = Scenario::new().mx(&["mx.zoho.com"]).build();

        engine.detect("example.com").await;
        tokio::time::advance(Duration::from_secs(301)).await;
        engine.detect("example.com").await;

        assert_eq!(calls.dns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_fresh_detection() {
        let (engine, calls) = Scenario::new().mx(&["mx.zoho.com"]).build();

        engine.detect("example.com").await;
        engine.clear_cache();
        engine.detect("example.com").await;

        assert_eq!(calls.dns.load(Ordering::SeqCst), 2);
        assert_eq!(calls.dns_clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_probe_once() {
        let (engine, calls) = Scenario::new().mx(&["mx.zoho.com"]).build();
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.detect("example.com").await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().platform, "zoho");
        }
        assert_eq!(calls.dns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_in_flight_entries_removed_after_completion() {
        let (engine, _) = Scenario::new().mx(&["mx.zoho.com"]).build();
        engine.detect("a.example").await;
        assert!(engine.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_detect_releases_in_flight_entry() {
        let calls = Arc::new(Calls::default());
        let collectors = Collectors {
            dns: Arc::new(StalledDns),
            ports: Arc::new(FakePorts { open: Vec::new(), calls: calls.clone() }),
            webmail: Arc::new(FakeWebmail { indicator: None, calls: calls.clone() }),
            whois: Arc::new(FakeWhois { text: None, calls: calls.clone() }),
        };
        let engine = Arc::new(DetectionEngine::with_parts(
            DetectionConfig::default(),
            collectors,
            Arc::new(TtlCache::new(Duration::from_secs(300), 100)),
        ));

        let mut handles = Vec::new();
        for i in 0..20 {
            let engine = engine.clone();
            // Two callers per domain so some are cancelled while waiting on the lock
            let domain = format!("d{}.example", i / 2);
            handles.push(tokio::spawn(async move { engine.detect(&domain).await }));
        }

        tokio::task::yield_now().await;
        assert!(!engine.in_flight.is_empty());

        for handle in handles {
            handle.abort();
            assert!(handle.await.unwrap_err().is_cancelled());
        }

        assert!(engine.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_tiers_are_skipped() {
        let calls = Arc::new(Calls::default());
        let collectors = Collectors {
            dns: Arc::new(FakeDns {
                signals: Some(DnsSignals::default()),
                calls: calls.clone(),
            }),
            ports: Arc::new(FakePorts { open: Vec::new(), calls: calls.clone() }),
            webmail: Arc::new(FakeWebmail {
                indicator: Some("/webmail".to_string()),
                calls: calls.clone(),
            }),
            whois: Arc::new(FakeWhois {
                text: Some("ns1.zoho.com".to_string()),
                calls: calls.clone(),
            }),
        };
        let config = DetectionConfig {
            enable_http_probe: false,
            enable_whois: false,
            ..Default::default()
        };
        let engine = DetectionEngine::with_parts(
            config,
            collectors,
            Arc::new(TtlCache::new(Duration::from_secs(300), 10)),
        );

        let result = engine.detect("example.com").await;
        assert_eq!(result.platform, knowledge_base::FALLBACK_PLATFORM);
        assert_eq!(calls.webmail.load(Ordering::SeqCst), 0);
        assert_eq!(calls.whois.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_score_is_independent_of_tiers() {
        // Port tier says cpanel, the scorer still ranks on DNS evidence
        let (engine, _) = Scenario::new()
            .mx(&["aspmx.l.google.com"])
            .spf(&["v=spf1 include:_spf.google.com ~all"])
            .open_ports(&[2095])
            .build();

        let result = engine.detect("example.com").await;
        assert_eq!(result.platform, "cpanel");

        let ranking = engine.score(&result);
        assert_eq!(ranking.top_platforms, vec!["google"]);
        assert_eq!(ranking.scores["google"], scoring::MX_WEIGHT + scoring::SPF_WEIGHT);
    }

    #[test]
    fn test_config_validation() {
        assert!(validate_config(&DetectionConfig::default()).is_ok());

        let zero_capacity = DetectionConfig {
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&zero_capacity),
            Err(DetectionError::ConfigurationError(_))
        ));

        let zero_timeout = DetectionConfig {
            port_timeout_ms: 0,
            ..Default::default()
        };
        assert!(validate_config(&zero_timeout).is_err());
    }
}
