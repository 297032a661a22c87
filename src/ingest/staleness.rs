// src/ingest/staleness.rs
//! Due/not-due decision for refetching a source. Pure; the caller injects the
//! clock, so the gate is trivially testable and reproducible.

use chrono::{DateTime, Utc};

/// Outcome of the gate, with a human-readable reason for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchDecision {
    pub should_fetch: bool,
    pub reason: String,
}

/// Decide whether a source is due for a refetch.
///
/// `force_refresh` always fetches; a source never fetched before always
/// fetches; otherwise fetch iff `now - last_fetched_at >= interval`.
pub fn evaluate(
    last_fetched_at: Option<DateTime<Utc>>,
    fetch_interval_secs: u64,
    now: DateTime<Utc>,
    force_refresh: bool,
) -> FetchDecision {
    if force_refresh {
        return FetchDecision {
            should_fetch: true,
            reason: "forced refresh".to_string(),
        };
    }
    let Some(last) = last_fetched_at else {
        return FetchDecision {
            should_fetch: true,
            reason: "never fetched".to_string(),
        };
    };
    let elapsed = (now - last).num_seconds().max(0) as u64;
    if elapsed >= fetch_interval_secs {
        FetchDecision {
            should_fetch: true,
            reason: format!("due: fetched {elapsed}s ago, interval is {fetch_interval_secs}s"),
        }
    } else {
        FetchDecision {
            should_fetch: false,
            reason: format!("skipped: fetched {elapsed}s ago, interval is {fetch_interval_secs}s"),
        }
    }
}
