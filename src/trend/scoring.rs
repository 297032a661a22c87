// src/trend/scoring.rs
//! Trend scoring: five weighted sub-signals, each normalized to [0,1],
//! combined and clamped. Pure and clock-injected, so a given `(item, now)`
//! pair always reproduces the same score bit-for-bit.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::heuristics::{count_occurrences, Heuristics};
use crate::model::Item;

/// Scores above this threshold get the breakout boost.
const BOOST_THRESHOLD: f64 = 0.8;
const BOOST_FACTOR: f64 = 1.10;

#[derive(Clone)]
pub struct TrendScorer {
    heuristics: Arc<Heuristics>,
}

impl TrendScorer {
    pub fn new(heuristics: Arc<Heuristics>) -> Self {
        Self { heuristics }
    }

    pub fn heuristics(&self) -> &Heuristics {
        &self.heuristics
    }

    /// Weighted combination of the five sub-signals, boosted past the
    /// breakout threshold, clamped to [0,1].
    pub fn score(&self, item: &Item, now: DateTime<Utc>) -> f64 {
        let hours_ago = (now - item.published_at).num_seconds() as f64 / 3600.0;
        let w = &self.heuristics.weights;

        let combined = recency_score(hours_ago) * w.recency
            + self.quality_score(item) * w.quality
            + self.relevance_score(item) * w.relevance
            + self.authority_score(item) * w.authority
            + self.engagement_score(item) * w.engagement;

        apply_breakout_boost(combined).clamp(0.0, 1.0)
    }

    /// Content quality from title shape, summary substance, and host
    /// reputation. Base 0.5, capped at 1.0.
    pub fn quality_score(&self, item: &Item) -> f64 {
        let mut score: f64 = 0.5;

        let title_len = item.title.chars().count();
        if title_len > 20 && title_len < 100 {
            score += 0.1;
        }
        let title_lower = item.title.to_lowercase();
        if self
            .heuristics
            .news_terms
            .iter()
            .any(|t| title_lower.contains(t.as_str()))
        {
            score += 0.1;
        }

        let summary_len = summary_chars(item);
        if summary_len > 100 {
            score += 0.1;
        }
        if summary_len > 300 {
            score += 0.1;
        }

        if self.heuristics.is_quality_domain(&item.url) {
            score += 0.1;
        }

        score.min(1.0)
    }

    /// Topic-keyword occurrences across title+summary, mapped to a discrete
    /// score: 0 → 0.3, 1 → 0.6, 2+ → 0.9.
    pub fn relevance_score(&self, item: &Item) -> f64 {
        let content = format!(
            "{} {}",
            item.title,
            item.summary.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        let matches: usize = self
            .heuristics
            .topic_keywords
            .iter()
            .map(|k| count_occurrences(&content, k))
            .sum();
        match matches {
            0 => 0.3,
            1 => 0.6,
            _ => 0.9,
        }
    }

    pub fn authority_score(&self, item: &Item) -> f64 {
        self.heuristics.authority_for(&item.url)
    }

    /// Engagement prediction from title phrasing and summary length.
    /// Base 0.5, capped at 1.0.
    pub fn engagement_score(&self, item: &Item) -> f64 {
        let mut score: f64 = 0.5;
        let title_lower = item.title.to_lowercase();

        if self
            .heuristics
            .question_words
            .iter()
            .any(|w| title_lower.starts_with(w.as_str()))
        {
            score += 0.1;
        }
        if self
            .heuristics
            .clickbait_terms
            .iter()
            .any(|w| title_lower.contains(w.as_str()))
        {
            score += 0.1;
        }
        if self
            .heuristics
            .howto_terms
            .iter()
            .any(|w| title_lower.contains(w.as_str()))
        {
            score += 0.1;
        }

        let summary_len = summary_chars(item);
        if summary_len > 50 && summary_len < 500 {
            score += 0.1;
        }

        score.min(1.0)
    }
}

fn summary_chars(item: &Item) -> usize {
    item.summary.as_deref().map_or(0, |s| s.chars().count())
}

/// Piecewise recency decay over `hours_ago`; future timestamps count as now.
pub fn recency_score(hours_ago: f64) -> f64 {
    let h = hours_ago.max(0.0);
    if h <= 1.0 {
        1.0
    } else if h <= 6.0 {
        0.9
    } else if h <= 24.0 {
        (-h / 12.0).exp()
    } else if h <= 72.0 {
        (-h / 36.0).exp()
    } else {
        (-h / 168.0).exp()
    }
}

/// Already-strong content gets a 10% boost, re-clamped to 1.0. Never lowers
/// a score.
pub fn apply_breakout_boost(score: f64) -> f64 {
    if score > BOOST_THRESHOLD {
        (score * BOOST_FACTOR).min(1.0)
    } else {
        score
    }
}
