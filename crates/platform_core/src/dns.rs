//! DNS signal collection using hickory-resolver
//!
//! MX, SPF, DKIM and autodiscover SRV records are gathered in one pass. Only
//! the MX lookup can fail the collection; every other record type degrades to
//! an empty or absent signal.

use crate::{DetectionError, DkimSelector};
use anyhow::{Context, Result};
use async_trait::async_trait;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    proto::rr::rdata::TXT,
    AsyncResolver, TokioAsyncResolver,
};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Selectors tried when the configuration does not name any
pub const DEFAULT_DKIM_SELECTORS: &[&str] = &["default", "selector1", "selector2"];

/// Marker every SPF policy record starts with
pub const SPF_MARKER: &str = "v=spf1";

/// SRV target substrings that identify a hosted Exchange deployment
const AUTODISCOVER_MARKERS: &[&str] = &["outlook", "office365", "exchange"];

/// Platform implied by an Exchange autodiscover target
const AUTODISCOVER_PLATFORM: &str = "outlook";

/// Everything the DNS tier learned about a domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsSignals {
    pub mx_hosts: Vec<String>,
    pub spf_txts: Vec<String>,
    pub dkim_selectors: Vec<DkimSelector>,
    /// Platform implied by `_autodiscover._tcp` SRV, if any
    pub autodiscover: Option<String>,
}

impl DnsSignals {
    /// MX hosts, SPF strings and DKIM records joined into one lowercase blob
    pub fn signal_text(&self) -> String {
        self.mx_hosts
            .iter()
            .chain(self.spf_txts.iter())
            .chain(self.dkim_selectors.iter().map(|dkim| &dkim.record))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Source of DNS signals for the resolution engine
#[async_trait]
pub trait DnsCollector: Send + Sync {
    /// Collect DNS signals for `domain`
    ///
    /// Fails only when the domain has no resolvable MX records.
    async fn collect(&self, domain: &str) -> crate::Result<DnsSignals>;

    /// Forget any DNS answers cached below the engine
    fn clear_cache(&self) {}
}

/// DNS resolver wrapper with optimized configuration
#[derive(Clone)]
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
    dkim_selectors: Vec<String>,
}

impl DnsResolver {
    /// Create a new DNS resolver with optimized settings
    ///
    /// # Arguments
    /// * `timeout_ms` - DNS query timeout in milliseconds
    /// * `attempts` - Maximum number of retry attempts
    /// * `cache_size` - Number of entries to cache
    /// * `min_ttl_secs` - Minimum TTL for positive cache entries
    /// * `dkim_selectors` - Selectors probed for DKIM keys
    pub fn new(
        timeout_ms: u64,
        attempts: usize,
        cache_size: usize,
        min_ttl_secs: u64,
        dkim_selectors: Vec<String>,
    ) -> Result<Self> {
        info!("Initializing DNS resolver with Cloudflare DNS");

        let config = ResolverConfig::cloudflare();

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_millis(timeout_ms);
        opts.attempts = attempts;
        opts.cache_size = cache_size;
        opts.positive_min_ttl = Some(Duration::from_secs(min_ttl_secs));
        opts.negative_min_ttl = Some(Duration::from_secs(30));
        opts.positive_max_ttl = Some(Duration::from_secs(3600));

        let resolver = AsyncResolver::tokio(config, opts);

        info!(
            "DNS resolver initialized - timeout: {}ms, attempts: {}, cache_size: {}, dkim selectors: {}",
            timeout_ms,
            attempts,
            cache_size,
            dkim_selectors.len()
        );

        Ok(Self {
            resolver,
            dkim_selectors,
        })
    }

    /// Get MX exchange hostnames for a domain
    ///
    /// # Returns
    /// * `Ok(hosts)` lowercased, without the trailing root dot
    /// * `Err(_)` on NXDOMAIN, timeout, or an empty answer
    pub async fn mx_hosts(&self, domain: &str) -> Result<Vec<String>> {
        debug!("Querying MX records for domain: {}", domain);

        let response = self
            .resolver
            .mx_lookup(domain)
            .await
            .with_context(|| format!("MX lookup failed for {}", domain))?;

        let hosts: Vec<String> = response
            .iter()
            .map(|mx| normalize_host(&mx.exchange().to_ascii()))
            .collect();

        if hosts.is_empty() {
            anyhow::bail!("no MX records for {}", domain);
        }

        debug!("Domain {} has {} MX record(s)", domain, hosts.len());
        Ok(hosts)
    }

    /// Get TXT records for a name, one string per record
    ///
    /// Lookup failures are treated as "no records".
    pub async fn txt_records(&self, name: &str) -> Vec<String> {
        txt_lookup(&self.resolver, name).await
    }

    /// Get TXT records that carry an SPF policy
    pub async fn spf_records(&self, domain: &str) -> Vec<String> {
        let records = self.txt_records(domain).await;
        let spf = filter_spf(records);
        debug!("Found {} SPF record(s) for {}", spf.len(), domain);
        spf
    }

    /// Check the configured DKIM selectors in parallel
    ///
    /// Selectors that do not resolve are skipped. Results keep selector order.
    pub async fn dkim_records(&self, domain: &str) -> Vec<DkimSelector> {
        debug!("Checking {} DKIM selectors for domain: {}", self.dkim_selectors.len(), domain);

        let mut join_set = JoinSet::new();

        for (index, selector) in self.dkim_selectors.iter().enumerate() {
            let resolver = self.resolver.clone();
            let selector = selector.clone();
            let name = format!("{}._domainkey.{}", selector, domain);

            join_set.spawn(async move {
                let records = txt_lookup(&resolver, &name).await;
                (index, selector, records)
            });
        }

        let mut found = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, selector, records)) if !records.is_empty() => {
                    found.push((index, DkimSelector { selector, record: records.concat() }));
                }
                Ok(_) => {}
                Err(e) => warn!("DKIM lookup task failed for {}: {}", domain, e),
            }
        }

        found.sort_by_key(|(index, _)| *index);
        let dkim: Vec<DkimSelector> = found.into_iter().map(|(_, dkim)| dkim).collect();

        debug!("Found {} DKIM records for {}", dkim.len(), domain);
        dkim
    }

    /// Resolve `_autodiscover._tcp.{domain}` and map an Exchange target to a platform
    pub async fn autodiscover(&self, domain: &str) -> Option<String> {
        let name = format!("_autodiscover._tcp.{}", domain);
        debug!("Checking autodiscover SRV at: {}", name);

        match self.resolver.srv_lookup(name.as_str()).await {
            Ok(response) => {
                let targets: Vec<String> = response
                    .iter()
                    .map(|srv| normalize_host(&srv.target().to_ascii()))
                    .collect();
                autodiscover_platform(&targets)
            }
            Err(e) => {
                debug!("SRV lookup failed for {}: {}", name, e);
                None
            }
        }
    }
}

#[async_trait]
impl DnsCollector for DnsResolver {
    async fn collect(&self, domain: &str) -> crate::Result<DnsSignals> {
        let mx_hosts = self.mx_hosts(domain).await.map_err(|e| {
            warn!("DNS lookup failed for {}: {:#}", domain, e);
            DetectionError::DnsResolutionFailed(format!("{:#}", e))
        })?;

        let (spf_txts, dkim_selectors, autodiscover) = tokio::join!(
            self.spf_records(domain),
            self.dkim_records(domain),
            self.autodiscover(domain)
        );

        Ok(DnsSignals {
            mx_hosts,
            spf_txts,
            dkim_selectors,
            autodiscover,
        })
    }

    fn clear_cache(&self) {
        self.resolver.clear_cache();
        info!("DNS cache cleared");
    }
}

async fn txt_lookup(resolver: &TokioAsyncResolver, name: &str) -> Vec<String> {
    match resolver.txt_lookup(name).await {
        Ok(response) => {
            let records: Vec<String> = response.iter().map(txt_to_string).collect();
            debug!("Found {} TXT record(s) for {}", records.len(), name);
            records
        }
        Err(e) => {
            debug!("TXT record lookup failed for {}: {}", name, e);
            Vec::new()
        }
    }
}

/// Character-strings of one TXT record, concatenated
fn txt_to_string(txt: &TXT) -> String {
    txt.txt_data()
        .iter()
        .map(|data| String::from_utf8_lossy(data))
        .collect()
}

fn normalize_host(host: &str) -> String {
    host.trim_end_matches('.').to_lowercase()
}

fn filter_spf(records: Vec<String>) -> Vec<String> {
    records
        .into_iter()
        .filter(|record| record.contains(SPF_MARKER))
        .collect()
}

fn autodiscover_platform(targets: &[String]) -> Option<String> {
    targets
        .iter()
        .any(|target| AUTODISCOVER_MARKERS.iter().any(|marker| target.contains(marker)))
        .then(|| AUTODISCOVER_PLATFORM.to_string())
}
