//! Static platform knowledge: keyword fingerprints and page keys
//!
//! Fingerprints are scanned in table order and the first platform with any
//! matching keyword wins. Keywords overlap across platforms (`yahoodns.net`
//! belongs to both yahoo and att), so the order below is part of the contract.

/// Platform id used when no tier produced a match
pub const FALLBACK_PLATFORM: &str = "fallback";

/// Page key served for the fallback platform and for unknown ids
pub const FALLBACK_PAGE_KEY: &str = "fallback";

/// Platform assigned when a control-panel signal fires
pub const CONTROL_PANEL_PLATFORM: &str = "cpanel";

/// Keyword fingerprint for one platform
#[derive(Debug, Clone, Copy)]
pub struct PlatformFingerprint {
    pub id: &'static str,
    pub keywords: &'static [&'static str],
}

/// Known platforms in match-precedence order
pub const PLATFORMS: &[PlatformFingerprint] = &[
    PlatformFingerprint {
        id: "google",
        keywords: &["google.com", "gmail.com", "aspmx.l.google.com", "_spf.google.com"],
    },
    PlatformFingerprint {
        id: "zoho",
        keywords: &["zoho.com", "mx.zoho.com", "_spf.zoho.com"],
    },
    PlatformFingerprint {
        id: "yahoo",
        keywords: &["yahoodns.net", "yahoo.com"],
    },
    PlatformFingerprint {
        id: "att",
        keywords: &["att.net", "yahoodns.net", "_spf.att.net"],
    },
    PlatformFingerprint {
        id: "outlook",
        keywords: &[
            "outlook.com",
            "office365.com",
            "protection.outlook.com",
            "_spf.protection.outlook.com",
        ],
    },
    PlatformFingerprint {
        id: "zimbra",
        keywords: &["zimbra", "zimbra.mail"],
    },
    PlatformFingerprint {
        id: CONTROL_PANEL_PLATFORM,
        keywords: &["cpanel", "webmail", "secureserver.net"],
    },
    PlatformFingerprint {
        id: "eim",
        keywords: &["eim.ae", "mail.eim.ae", "_spf.eim.ae"],
    },
    PlatformFingerprint {
        id: "protonmail",
        keywords: &["protonmail.ch", "proton.me", "mail.protonmail.ch", "_spf.protonmail.ch"],
    },
    PlatformFingerprint {
        id: "fastmail",
        keywords: &["fastmail.com", "messagingengine.com", "_spf.messagingengine.com"],
    },
    PlatformFingerprint {
        id: "yandex",
        keywords: &["yandex.ru", "yandex.net", "mx.yandex.net", "_spf.yandex.net"],
    },
    PlatformFingerprint {
        id: "gmx",
        keywords: &["gmx.net", "mx00.gmx.net", "_spf.gmx.net"],
    },
    PlatformFingerprint {
        id: "rackspace",
        keywords: &["rackspace.com", "emailsrvr.com", "_spf.emailsrvr.com"],
    },
    PlatformFingerprint {
        id: "icloud",
        keywords: &["icloud.com", "me.com", "mac.com", "_spf.apple.com"],
    },
];

/// Platform id to page key. Ids not listed here map to themselves if known.
const PAGE_KEY_OVERRIDES: &[(&str, &str)] = &[("google", "gmail")];

impl PlatformFingerprint {
    /// Whether any keyword occurs in `text`. `text` must already be lowercase.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|keyword| text.contains(keyword))
    }
}

/// First platform, in table order, with a keyword contained in `text`
///
/// The text is lowercased before scanning.
pub fn match_keywords(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    PLATFORMS
        .iter()
        .find(|platform| platform.matches(&text))
        .map(|platform| platform.id)
}

/// Look up a fingerprint by platform id
pub fn fingerprint(id: &str) -> Option<&'static PlatformFingerprint> {
    PLATFORMS.iter().find(|platform| platform.id == id)
}

/// Map a platform id to the page key the front-end routes on
///
/// Unknown ids, including the fallback platform, map to [`FALLBACK_PAGE_KEY`].
pub fn page_key(platform: &str) -> &'static str {
    if let Some((_, key)) = PAGE_KEY_OVERRIDES.iter().find(|(id, _)| *id == platform) {
        return key;
    }

    fingerprint(platform)
        .map(|platform| platform.id)
        .unwrap_or(FALLBACK_PAGE_KEY)
}

/// Number of known platforms
pub fn platform_count() -> usize {
    PLATFORMS.len()
}
