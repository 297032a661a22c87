// src/ingest/providers/rss.rs
//! Syndication feed fetcher. Parses both RSS 2.0 (`<rss><channel><item>`) and
//! Atom (`<feed><entry>`) documents with quick-xml; parsing is pure so tests
//! run on fixture strings without touching the network.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{FeedEntry, FeedFetcher, FetchOutcome};
use crate::ingest::{
    find_image_in_html, parse_entry_date, strip_markup, truncate_chars, SUMMARY_MAX_CHARS,
};
use crate::model::{Source, SourceKind};

/// Most recent entries kept per RSS fetch (feeds list newest first).
pub const RSS_ENTRY_CAP: usize = 20;

/* ----------------------------
Wire structs (quick-xml serde)
---------------------------- */

#[derive(Debug, Deserialize)]
struct RssDoc {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssEntry>,
}

#[derive(Debug, Deserialize, Default)]
struct RssEntry {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    #[serde(rename = "content:encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "media:thumbnail", default)]
    media_thumbnails: Vec<MediaRef>,
    #[serde(rename = "media:content", default)]
    media_contents: Vec<MediaRef>,
    #[serde(rename = "enclosure", default)]
    enclosures: Vec<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct MediaRef {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
    #[serde(rename = "@medium")]
    medium: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomDoc {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize, Default)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    #[serde(rename = "media:group")]
    media_group: Option<MediaGroup>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MediaGroup {
    #[serde(rename = "media:description")]
    description: Option<String>,
    #[serde(rename = "media:thumbnail", default)]
    thumbnails: Vec<MediaRef>,
}

/* ----------------------------
Pure parsing
---------------------------- */

/// Parse a feed document into normalized entries, newest-first feed order,
/// capped at `cap`. `now` is the fallback publish date for unparseable dates.
pub fn parse_feed(xml: &str, cap: usize, now: DateTime<Utc>) -> Result<Vec<FeedEntry>> {
    // RSS first: an Atom document fails the `channel` requirement and falls
    // through; the reverse order would silently parse RSS docs as empty Atom.
    match from_str::<RssDoc>(xml) {
        Ok(doc) => Ok(doc
            .channel
            .items
            .into_iter()
            .take(cap)
            .filter_map(entry_from_rss(now))
            .collect()),
        Err(rss_err) => {
            let doc: AtomDoc = from_str(xml)
                .map_err(|atom_err| {
                    anyhow::anyhow!("not RSS ({rss_err}) and not Atom ({atom_err})")
                })
                .context("parsing feed xml")?;
            Ok(doc
                .entries
                .into_iter()
                .take(cap)
                .filter_map(entry_from_atom(now))
                .collect())
        }
    }
}

fn entry_from_rss(now: DateTime<Utc>) -> impl Fn(RssEntry) -> Option<FeedEntry> {
    move |e: RssEntry| {
        let url = e.link.as_deref().map(str::trim).filter(|l| !l.is_empty())?.to_string();
        let image_url = image_from_rss(&e);
        let summary = extract_summary(&[
            e.summary.as_deref(),
            e.description.as_deref(),
            e.content_encoded.as_deref(),
        ]);
        Some(FeedEntry {
            title: e.title.as_deref().map(strip_markup).unwrap_or_default(),
            url,
            summary,
            published_at: parse_entry_date(e.pub_date.as_deref(), now),
            image_url,
        })
    }
}

fn entry_from_atom(now: DateTime<Utc>) -> impl Fn(AtomEntry) -> Option<FeedEntry> {
    move |e: AtomEntry| {
        let url = atom_entry_link(&e.links)?;
        let image_url = e
            .media_group
            .as_ref()
            .and_then(|g| g.thumbnails.iter().find_map(|t| t.url.clone()));
        let summary = extract_summary(&[
            e.summary.as_deref(),
            e.media_group.as_ref().and_then(|g| g.description.as_deref()),
        ]);
        Some(FeedEntry {
            title: e.title.as_deref().map(strip_markup).unwrap_or_default(),
            url,
            summary,
            published_at: parse_entry_date(
                e.published.as_deref().or(e.updated.as_deref()),
                now,
            ),
            image_url,
        })
    }
}

fn atom_entry_link(links: &[AtomLink]) -> Option<String> {
    // Prefer rel="alternate" (or no rel), as channel feeds also carry
    // rel="self"/"hub" links.
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|l| l.href.clone())
        .filter(|h| !h.is_empty())
}

/// First populated candidate field, markup-stripped and clipped.
fn extract_summary(candidates: &[Option<&str>]) -> Option<String> {
    let raw = candidates.iter().flatten().find(|s| !s.trim().is_empty())?;
    let text = truncate_chars(&strip_markup(raw), SUMMARY_MAX_CHARS);
    (!text.is_empty()).then_some(text)
}

/// Image resolution priority: media:thumbnail, media:content marked image,
/// image enclosure, then an `<img>` scan of the entry's HTML body.
fn image_from_rss(e: &RssEntry) -> Option<String> {
    if let Some(url) = e.media_thumbnails.iter().find_map(|m| m.url.clone()) {
        return Some(url);
    }
    for m in &e.media_contents {
        let is_image = m.medium.as_deref() == Some("image")
            || m.mime.as_deref().is_some_and(|t| t.contains("image"));
        if is_image {
            if let Some(url) = m.url.clone() {
                return Some(url);
            }
        }
    }
    for enc in &e.enclosures {
        if enc.mime.as_deref().is_some_and(|t| t.starts_with("image/")) {
            if let Some(url) = enc.url.clone() {
                return Some(url);
            }
        }
    }
    let html = e
        .content_encoded
        .as_deref()
        .or(e.summary.as_deref())
        .or(e.description.as_deref())?;
    find_image_in_html(html)
}

/* ----------------------------
Fetcher
---------------------------- */

pub struct RssFetcher {
    client: reqwest::Client,
}

impl RssFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedFetcher for RssFetcher {
    async fn fetch(&self, source: &Source) -> Result<FetchOutcome> {
        let body = self
            .client
            .get(&source.locator)
            .send()
            .await
            .with_context(|| format!("GET {}", source.locator))?
            .error_for_status()
            .context("feed responded with error status")?
            .text()
            .await
            .context("reading feed body")?;

        let entries = parse_feed(&body, RSS_ENTRY_CAP, Utc::now())?;
        counter!("ingest_entries_total").increment(entries.len() as u64);
        Ok(FetchOutcome {
            entries,
            note: None,
        })
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }
}
