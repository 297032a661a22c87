// src/ingest/providers/video.rs
//! Video channel fetcher. Resolves a human handle to a stable channel id by
//! probing the canonical profile URLs and pattern-matching the returned HTML,
//! then reads the channel's Atom feed like any other syndication source.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::debug;

use crate::ingest::providers::rss::parse_feed;
use crate::ingest::types::{FeedFetcher, FetchOutcome};
use crate::model::{Source, SourceKind};

/// Most recent videos kept per channel fetch.
pub const VIDEO_ENTRY_CAP: usize = 10;

/// An already-valid channel id: `UC` followed by 22 id characters.
pub fn is_channel_id(s: &str) -> bool {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^UC[0-9A-Za-z_-]{22}$").unwrap())
        .is_match(s)
}

/// Channel-id extraction patterns, tried in order; first match wins.
fn channel_id_patterns() -> &'static [Regex] {
    static RES: OnceCell<Vec<Regex>> = OnceCell::new();
    RES.get_or_init(|| {
        [
            r#""channelId":"(UC[0-9A-Za-z_-]{22})""#,
            r#""externalId":"(UC[0-9A-Za-z_-]{22})""#,
            r"/channel/(UC[0-9A-Za-z_-]{22})",
            r#"<link rel="canonical" href="https://www\.youtube\.com/channel/(UC[0-9A-Za-z_-]{22})""#,
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Scan profile-page HTML for the channel id.
pub fn extract_channel_id(html: &str) -> Option<String> {
    channel_id_patterns()
        .iter()
        .find_map(|re| re.captures(html).map(|c| c[1].to_string()))
}

/// Video id from the common watch-URL shapes.
pub fn extract_video_id(url: &str) -> Option<String> {
    static RES: OnceCell<Vec<Regex>> = OnceCell::new();
    let patterns = RES.get_or_init(|| {
        [
            r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?]+)",
            r"youtube\.com/embed/([^&\n?]+)",
            r"youtube\.com/v/([^&\n?]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });
    patterns
        .iter()
        .find_map(|re| re.captures(url).map(|c| c[1].to_string()))
}

/// Deterministic thumbnail URL for a watch URL, when a video id is present.
pub fn thumbnail_for(video_url: &str) -> Option<String> {
    extract_video_id(video_url).map(|id| format!("https://i.ytimg.com/vi/{id}/maxresdefault.jpg"))
}

/// Feed locator for a resolved channel id.
pub fn channel_feed_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}")
}

pub struct VideoChannelFetcher {
    client: reqwest::Client,
}

impl VideoChannelFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Resolve a handle or id to a channel id. Valid ids pass through
    /// unchanged; otherwise the canonical profile URLs are probed in order.
    async fn resolve_channel_id(&self, locator: &str) -> Result<String> {
        let trimmed = locator.trim();
        if is_channel_id(trimmed) {
            return Ok(trimmed.to_string());
        }

        let handle = trimmed.trim_start_matches('@');
        let candidates = [
            format!("https://www.youtube.com/@{handle}"),
            format!("https://www.youtube.com/c/{handle}"),
            format!("https://www.youtube.com/user/{handle}"),
        ];
        for url in &candidates {
            let html = match self.fetch_page(url).await {
                Ok(body) => body,
                Err(e) => {
                    debug!(target: "ingest", url = %url, error = ?e, "channel probe failed");
                    continue;
                }
            };
            if let Some(id) = extract_channel_id(&html) {
                return Ok(id);
            }
        }
        bail!("could not resolve channel id for `{locator}`")
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .context("profile page responded with error status")?
            .text()
            .await
            .context("reading profile page body")
    }
}

#[async_trait]
impl FeedFetcher for VideoChannelFetcher {
    async fn fetch(&self, source: &Source) -> Result<FetchOutcome> {
        let channel_id = self.resolve_channel_id(&source.locator).await?;
        let feed_url = channel_feed_url(&channel_id);

        let body = self
            .client
            .get(&feed_url)
            .send()
            .await
            .with_context(|| format!("GET {feed_url}"))?
            .error_for_status()
            .context("channel feed responded with error status")?
            .text()
            .await
            .context("reading channel feed body")?;

        let mut entries = parse_feed(&body, VIDEO_ENTRY_CAP, Utc::now())?;
        for entry in &mut entries {
            // Derived thumbnail wins; the feed's own media:thumbnail stays as
            // fallback for unparseable links.
            if let Some(thumb) = thumbnail_for(&entry.url) {
                entry.image_url = Some(thumb);
            }
        }
        counter!("ingest_entries_total").increment(entries.len() as u64);
        Ok(FetchOutcome {
            entries,
            note: None,
        })
    }

    fn kind(&self) -> SourceKind {
        SourceKind::VideoChannel
    }
}
