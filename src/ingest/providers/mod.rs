// src/ingest/providers/mod.rs
pub mod rss;
pub mod social;
pub mod video;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::ingest::types::FeedFetcher;

pub use rss::RssFetcher;
pub use social::SocialStreamFetcher;
pub use video::VideoChannelFetcher;

/// Shared HTTP client for all fetchers, with the per-request timeout applied
/// at the client level.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("trendfeed/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client")
}

/// The default fetcher set: one implementation per source kind.
pub fn default_fetchers(client: reqwest::Client) -> Vec<Arc<dyn FeedFetcher>> {
    vec![
        Arc::new(RssFetcher::new(client.clone())),
        Arc::new(VideoChannelFetcher::new(client)),
        Arc::new(SocialStreamFetcher::new()),
    ]
}
