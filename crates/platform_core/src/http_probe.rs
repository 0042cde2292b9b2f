//! Webmail endpoint probe
//!
//! Every well-known login path is requested over HTTPS and HTTP at once. The
//! first 200 response wins and the remaining requests are aborted. Anything
//! else (redirects, 4xx/5xx, TLS or connect errors, timeouts) is a miss for
//! that combination, and a domain where every combination misses simply has
//! no webmail indicator.

use crate::knowledge_base::CONTROL_PANEL_PLATFORM;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{redirect, Client, StatusCode};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Tag reported for an Outlook Web Access login page
pub const OWA_TAG: &str = "owa";

/// Tag reported for a Zimbra web client
pub const ZIMBRA_TAG: &str = "zimbra";

/// Schemes tried for every path
const SCHEMES: &[&str] = &["https", "http"];

/// Probed paths with the tag reported when the path is distinguishing.
/// Paths without a tag report themselves.
pub const WEBMAIL_PATHS: &[(&str, Option<&str>)] = &[
    ("/owa/auth/logon.aspx", Some(OWA_TAG)),
    ("/zimbra/", Some(ZIMBRA_TAG)),
    ("/webmail", None),
    ("/roundcube/", None),
    ("/squirrelmail/", None),
    ("/horde/", None),
];

/// Generic webmail clients bundled with hosting control panels
const CONTROL_PANEL_CLIENTS: &[&str] = &["webmail", "roundcube", "squirrelmail", "horde"];

/// Source of webmail endpoint evidence
#[async_trait]
pub trait WebmailProbe: Send + Sync {
    /// Match tag of the first webmail endpoint that answered 200, if any
    async fn probe_webmail(&self, domain: &str) -> Option<String>;
}

/// Probe racing GET requests with reqwest
#[derive(Debug, Clone)]
pub struct HttpWebmailProbe {
    client: Client,
}

impl HttpWebmailProbe {
    /// Create a probe whose requests each time out after `timeout_ms`
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            "Webmail probe initialized - timeout: {}ms, {} candidate URLs per domain",
            timeout_ms,
            SCHEMES.len() * WEBMAIL_PATHS.len()
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl WebmailProbe for HttpWebmailProbe {
    async fn probe_webmail(&self, domain: &str) -> Option<String> {
        let mut join_set = JoinSet::new();

        for (url, tag) in candidate_urls(domain) {
            let client = self.client.clone();
            join_set.spawn(async move {
                match client.get(&url).send().await {
                    Ok(response) if response.status() == StatusCode::OK => Some((url, tag)),
                    Ok(response) => {
                        debug!("{} answered {}", url, response.status());
                        None
                    }
                    Err(e) => {
                        debug!("{} failed: {}", url, e);
                        None
                    }
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            if let Ok(Some((url, tag))) = joined {
                join_set.abort_all();
                debug!("Webmail endpoint found at {} ({})", url, tag);
                return Some(tag);
            }
        }

        debug!("No webmail endpoint answered for {}", domain);
        None
    }
}

/// Cross product of schemes and paths with the tag each would report
pub fn candidate_urls(domain: &str) -> Vec<(String, String)> {
    SCHEMES
        .iter()
        .flat_map(|scheme| {
            WEBMAIL_PATHS.iter().map(move |(path, tag)| {
                (
                    format!("{}://{}{}", scheme, domain, path),
                    tag.unwrap_or(*path).to_string(),
                )
            })
        })
        .collect()
}

/// Platform a webmail match tag points to
///
/// Distinguishing tags map to their platform. Generic paths map to the
/// control-panel platform when they name a bundled webmail client.
pub fn platform_for_indicator(indicator: &str) -> Option<&'static str> {
    match indicator {
        OWA_TAG => Some("outlook"),
        ZIMBRA_TAG => Some("zimbra"),
        path => {
            let path = path.to_lowercase();
            CONTROL_PANEL_CLIENTS
                .iter()
                .any(|client| path.contains(client))
                .then_some(CONTROL_PANEL_PLATFORM)
        }
    }
}
