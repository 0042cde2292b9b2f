//! Weighted platform scoring
//!
//! An alternate ranking next to the tiered first-match resolution. Every
//! platform collects points for each signal entry one of its keywords hits:
//! MX entries weigh 3, SPF entries 2 and DKIM records 1. The two rankings can
//! disagree on the same input and are kept separate on purpose.

use crate::knowledge_base::{PlatformFingerprint, PLATFORMS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MX_WEIGHT: u32 = 3;
pub const SPF_WEIGHT: u32 = 2;
pub const DKIM_WEIGHT: u32 = 1;

/// Per-platform scores and the platforms sharing the best one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformScores {
    /// Every platform tied on the highest score, in knowledge-base order
    pub top_platforms: Vec<String>,
    /// Score of every known platform
    pub scores: BTreeMap<String, u32>,
}

/// Score every known platform against the collected signals
pub fn score<S: AsRef<str>>(mx_hosts: &[S], spf_txts: &[S], dkim_records: &[S]) -> PlatformScores {
    let scores: Vec<(&PlatformFingerprint, u32)> = PLATFORMS
        .iter()
        .map(|platform| {
            let total = hits(platform, mx_hosts) * MX_WEIGHT
                + hits(platform, spf_txts) * SPF_WEIGHT
                + hits(platform, dkim_records) * DKIM_WEIGHT;
            (platform, total)
        })
        .collect();

    let highest = scores.iter().map(|(_, score)| *score).max().unwrap_or(0);

    let top_platforms = scores
        .iter()
        .filter(|(_, score)| *score == highest)
        .map(|(platform, _)| platform.id.to_string())
        .collect();

    PlatformScores {
        top_platforms,
        scores: scores
            .into_iter()
            .map(|(platform, score)| (platform.id.to_string(), score))
            .collect(),
    }
}

/// Number of entries in which any of the platform's keywords occurs
fn hits<S: AsRef<str>>(platform: &PlatformFingerprint, entries: &[S]) -> u32 {
    entries
        .iter()
        .filter(|entry| platform.matches(&entry.as_ref().to_lowercase()))
        .count() as u32
}
