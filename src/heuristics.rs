// src/heuristics.rs
//! # Scoring Heuristics
//!
//! Configurable tables driving the trend scorer: signal weights, the domain
//! authority map, the quality-domain allowlist, and the keyword/term lists.
//!
//! - Loads from JSON config (`config/heuristics.json` by default,
//!   `HEURISTICS_CONFIG_PATH` overrides).
//! - Falls back to a built-in `default_seed()` so the engine always boots.
//! - Authority lookups key on the registrable domain (host minus `www.`),
//!   clamped to `[0.0, 1.0]`, with a configurable default for unknown hosts.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

pub const DEFAULT_HEURISTICS_PATH: &str = "config/heuristics.json";
pub const ENV_HEURISTICS_PATH: &str = "HEURISTICS_CONFIG_PATH";

/// Relative weight of each sub-signal in the final trend score.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalWeights {
    #[serde(default = "d_recency")]
    pub recency: f64,
    #[serde(default = "d_quality")]
    pub quality: f64,
    #[serde(default = "d_relevance")]
    pub relevance: f64,
    #[serde(default = "d_authority")]
    pub authority: f64,
    #[serde(default = "d_engagement")]
    pub engagement: f64,
}

fn d_recency() -> f64 {
    0.40
}
fn d_quality() -> f64 {
    0.25
}
fn d_relevance() -> f64 {
    0.20
}
fn d_authority() -> f64 {
    0.10
}
fn d_engagement() -> f64 {
    0.05
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            recency: d_recency(),
            quality: d_quality(),
            relevance: d_relevance(),
            authority: d_authority(),
            engagement: d_engagement(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Heuristics {
    #[serde(default)]
    pub weights: SignalWeights,
    /// Authority score for unknown domains.
    #[serde(default = "default_authority_weight")]
    pub default_authority: f64,
    /// Registrable domain → authority score.
    #[serde(default)]
    pub authority: HashMap<String, f64>,
    /// Domains whose items get the quality-signal bonus.
    #[serde(default)]
    pub quality_domains: Vec<String>,
    /// News-value terms looked for in titles.
    #[serde(default)]
    pub news_terms: Vec<String>,
    /// Topic keywords counted for the relevance signal and keyword trends.
    #[serde(default)]
    pub topic_keywords: Vec<String>,
    /// Question words an engaging title may start with.
    #[serde(default)]
    pub question_words: Vec<String>,
    /// Superlative/clickbait terms.
    #[serde(default)]
    pub clickbait_terms: Vec<String>,
    /// How-to / tutorial terms.
    #[serde(default)]
    pub howto_terms: Vec<String>,
}

fn default_authority_weight() -> f64 {
    0.5
}

impl Heuristics {
    /// Load configuration using env var + fallbacks:
    /// 1) `$HEURISTICS_CONFIG_PATH`
    /// 2) `config/heuristics.json`
    /// 3) `default_seed()`
    pub fn load_default() -> Self {
        if let Ok(p) = std::env::var(ENV_HEURISTICS_PATH) {
            return Self::load_from_file(p);
        }
        Self::load_from_file(DEFAULT_HEURISTICS_PATH)
    }

    /// Load configuration from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Authority score for an item URL: registrable-domain exact match against
    /// the authority table, `default_authority` for unknown hosts.
    pub fn authority_for(&self, url: &str) -> f64 {
        let score = registrable_domain(url)
            .and_then(|d| self.authority.get(&d).copied())
            .unwrap_or(self.default_authority);
        score.clamp(0.0, 1.0)
    }

    /// Whether the URL's host is on the curated quality allowlist.
    pub fn is_quality_domain(&self, url: &str) -> bool {
        match registrable_domain(url) {
            Some(d) => self.quality_domains.iter().any(|q| q.eq_ignore_ascii_case(&d)),
            None => false,
        }
    }

    /// Built-in seed tables. Used as fallback if no config is found.
    pub fn default_seed() -> Self {
        let mut authority = HashMap::new();
        for (domain, score) in [
            ("techcrunch.com", 0.95),
            ("reuters.com", 0.95),
            ("cnn.com", 0.90),
            ("bbc.com", 0.90),
            ("bloomberg.com", 0.90),
            ("wsj.com", 0.90),
            ("nytimes.com", 0.85),
            ("wired.com", 0.85),
            ("theverge.com", 0.80),
            ("arstechnica.com", 0.80),
            ("engadget.com", 0.75),
            ("mashable.com", 0.70),
            ("substack.com", 0.65),
            ("medium.com", 0.60),
        ] {
            authority.insert(domain.to_string(), score);
        }

        Self {
            weights: SignalWeights::default(),
            default_authority: default_authority_weight(),
            authority,
            quality_domains: to_strings(&["techcrunch.com", "cnn.com", "bbc.com", "reuters.com"]),
            news_terms: to_strings(&["breaking", "exclusive", "update", "announces"]),
            topic_keywords: to_strings(&[
                "ai",
                "artificial intelligence",
                "machine learning",
                "blockchain",
                "cryptocurrency",
                "bitcoin",
                "ethereum",
                "nft",
                "metaverse",
                "vr",
                "ar",
                "quantum",
                "5g",
                "iot",
                "cybersecurity",
                "startup",
                "venture capital",
                "ipo",
                "merger",
                "acquisition",
            ]),
            question_words: to_strings(&["how", "why", "what", "when", "where"]),
            clickbait_terms: to_strings(&["top", "best", "worst", "amazing", "shocking"]),
            howto_terms: to_strings(&["guide", "tutorial", "tips", "tricks"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Host component of a URL, lowercased, with a leading `www.` stripped.
pub fn registrable_domain(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Non-overlapping occurrences of `needle` in `haystack`. Both sides are
/// expected lowercased by the caller.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}
