//! WHOIS lookup (RFC 3912, TCP port 43) and registration-text matching
//!
//! The registry server is picked by TLD. When the registry answer names a
//! registrar WHOIS server, that server is queried once more and both answers
//! are scanned. The whole exchange is bounded by a single timeout.

use crate::knowledge_base;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const WHOIS_PORT: u16 = 43;

/// Largest answer read from a single server
const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

/// Source of WHOIS-derived platform evidence
#[async_trait]
pub trait WhoisCollector: Send + Sync {
    /// Platform id whose fingerprint appears in the domain's WHOIS text
    async fn collect(&self, domain: &str) -> Option<String>;
}

pub struct WhoisClient {
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Fetch the raw WHOIS text for a domain, following one referral
    pub async fn query(&self, domain: &str) -> Result<String> {
        tokio::time::timeout(self.timeout, self.query_with_referral(domain))
            .await
            .with_context(|| format!("WHOIS lookup for {} timed out", domain))?
    }

    async fn query_with_referral(&self, domain: &str) -> Result<String> {
        let server = whois_server(domain);
        let mut text = query_server(server, domain).await?;

        if let Some(referral) = referral_server(&text) {
            if !referral.eq_ignore_ascii_case(server) {
                debug!("Following WHOIS referral from {} to {}", server, referral);
                match query_server(&referral, domain).await {
                    Ok(registrar_text) => {
                        text.push('\n');
                        text.push_str(&registrar_text);
                    }
                    Err(e) => debug!("Registrar WHOIS {} failed: {:#}", referral, e),
                }
            }
        }

        Ok(text)
    }
}

#[async_trait]
impl WhoisCollector for WhoisClient {
    async fn collect(&self, domain: &str) -> Option<String> {
        match self.query(domain).await {
            Ok(text) => {
                let matched = match_whois_text(&text);
                debug!("WHOIS match for {}: {:?}", domain, matched);
                matched.map(str::to_string)
            }
            Err(e) => {
                debug!("WHOIS lookup failed for {}: {:#}", domain, e);
                None
            }
        }
    }
}

async fn query_server(server: &str, domain: &str) -> Result<String> {
    let mut stream = TcpStream::connect((server, WHOIS_PORT))
        .await
        .with_context(|| format!("Failed to connect to WHOIS server {}", server))?;

    stream
        .write_all(format!("{}\r\n", domain).as_bytes())
        .await
        .context("Failed to send WHOIS query")?;

    let mut response = Vec::new();
    stream
        .take(MAX_RESPONSE_BYTES)
        .read_to_end(&mut response)
        .await
        .context("Failed to read WHOIS response")?;

    Ok(String::from_utf8_lossy(&response).into_owned())
}

/// Registry WHOIS server for the domain's TLD
fn whois_server(domain: &str) -> &'static str {
    let tld = domain.rsplit('.').next().unwrap_or("").to_lowercase();

    match tld.as_str() {
        "com" | "net" => "whois.verisign-grs.com",
        "org" => "whois.pir.org",
        "io" => "whois.nic.io",
        "ai" => "whois.nic.ai",
        "dev" | "app" => "whois.nic.google",
        "me" => "whois.nic.me",
        "co" => "whois.nic.co",
        "ae" => "whois.aeda.net.ae",
        "br" => "whois.registro.br",
        "uk" => "whois.nic.uk",
        "de" => "whois.denic.de",
        "fr" => "whois.nic.fr",
        "jp" => "whois.jprs.jp",
        "cn" => "whois.cnnic.cn",
        "ru" => "whois.tcinet.ru",
        _ => "whois.iana.org",
    }
}

/// Registrar WHOIS server named in a registry answer
fn referral_server(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let (key, value) = line.trim().split_once(':')?;
        let key = key.trim().to_lowercase();
        if key != "registrar whois server" && key != "whois" && key != "refer" {
            return None;
        }

        let server = value
            .trim()
            .trim_start_matches("whois://")
            .trim_end_matches('/')
            .to_lowercase();
        (!server.is_empty()).then_some(server)
    })
}

/// First platform, in knowledge-base order, fingerprinted in WHOIS text
pub fn match_whois_text(text: &str) -> Option<&'static str> {
    knowledge_base::match_keywords(text)
}
