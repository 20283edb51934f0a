//! Generic RSS 2.0 / Atom feed reader.
//!
//! Used for Bloomberg, The Economist and any other configured feed. The
//! document is walked with a streaming `quick-xml` reader; every `<item>` or
//! `<entry>` is collected into a loose [`RawEntry`] and then validated on its
//! own. An entry without a title or a usable http(s) link is skipped with a
//! warning. Only XML that cannot be tokenized fails the whole feed.

use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::models::{ArticleRecord, Source};
use crate::utils::{strip_html, truncate_chars};
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Summaries longer than this many characters are cut.
const MAX_SUMMARY_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Published,
    Guid,
}

fn field_for(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"description" | b"summary" => Some(Field::Summary),
        b"encoded" | b"content" => Some(Field::Content),
        b"pubDate" | b"published" | b"updated" | b"date" => Some(Field::Published),
        b"guid" | b"id" => Some(Field::Guid),
        _ => None,
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// Everything collected for one entry before validation.
#[derive(Debug, Default)]
struct RawEntry {
    title: String,
    link: String,
    summary: String,
    content: String,
    published: String,
    guid: String,
}

impl RawEntry {
    /// First non-empty value wins.
    fn set(&mut self, field: Field, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Guid => &mut self.guid,
        };
        if slot.is_empty() {
            *slot = value.to_string();
        }
    }

    fn into_record(self, source: Source, section: &str) -> Result<ArticleRecord, &'static str> {
        let title = strip_html(&self.title);
        if title.is_empty() {
            return Err("entry has no title");
        }
        let url = [self.link.as_str(), self.guid.as_str()]
            .into_iter()
            .find_map(web_url)
            .ok_or("entry has no http(s) link")?;

        let raw_summary = if self.summary.is_empty() {
            &self.content
        } else {
            &self.summary
        };
        let mut summary = strip_html(raw_summary);
        if let Some(cut) = truncate_chars(&summary, MAX_SUMMARY_CHARS) {
            summary = cut.to_string();
        }

        Ok(ArticleRecord {
            title,
            url,
            summary,
            source,
            section: section.to_string(),
            published_at: parse_date(&self.published),
        })
    }
}

fn web_url(candidate: &str) -> Option<String> {
    let url = Url::parse(candidate.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Parse an RSS (RFC 2822) or Atom (RFC 3339) timestamp.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `href` of an Atom `<link>`, ignoring non-alternate relations.
fn link_href(element: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    for attr in element.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" if value != "alternate" => return None,
            _ => {}
        }
    }
    href.map(|h| unescape(&h).map(|c| c.into_owned()).unwrap_or(h))
}

fn push_entity(text: &mut String, name: &str) {
    let reference = format!("&{name};");
    match unescape(&reference) {
        Ok(resolved) => text.push_str(&resolved),
        // HTML entities such as &nbsp; are not XML; keep the text readable.
        Err(_) => text.push(' '),
    }
}

/// Result of parsing one feed document.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub records: Vec<ArticleRecord>,
    /// Entries dropped because they had no title or link.
    pub skipped: usize,
}

/// Parse an RSS or Atom document into records.
pub fn parse_feed(xml: &str, source: Source, section: &str) -> Result<ParsedFeed, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut parsed = ParsedFeed::default();

    let mut entry: Option<RawEntry> = None;
    // Field being captured and how many child elements deep we are inside it.
    let mut capture: Option<(Field, usize)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if let Some((_, depth)) = capture.as_mut() {
                    *depth += 1;
                    continue;
                }
                let name = e.local_name();
                if is_entry(name.as_ref()) {
                    entry = Some(RawEntry::default());
                } else if let Some(current) = entry.as_mut() {
                    if name.as_ref() == b"link" {
                        if let Some(href) = link_href(&e) {
                            current.set(Field::Link, &href);
                        }
                    }
                    if let Some(field) = field_for(name.as_ref()) {
                        capture = Some((field, 0));
                        text.clear();
                    }
                }
            }
            Event::Empty(e) => {
                if capture.is_none() && e.local_name().as_ref() == b"link" {
                    if let (Some(current), Some(href)) = (entry.as_mut(), link_href(&e)) {
                        current.set(Field::Link, &href);
                    }
                }
            }
            Event::Text(t) if capture.is_some() => text.push_str(&String::from_utf8_lossy(&t)),
            Event::CData(c) if capture.is_some() => text.push_str(&String::from_utf8_lossy(&c)),
            Event::GeneralRef(r) if capture.is_some() => {
                push_entity(&mut text, &String::from_utf8_lossy(&r))
            }
            Event::End(e) => {
                if let Some((field, depth)) = capture {
                    if depth > 0 {
                        capture = Some((field, depth - 1));
                    } else {
                        if let Some(current) = entry.as_mut() {
                            current.set(field, &text);
                        }
                        capture = None;
                        text.clear();
                    }
                    continue;
                }
                if is_entry(e.local_name().as_ref()) {
                    if let Some(raw) = entry.take() {
                        match raw.into_record(source, section) {
                            Ok(record) => parsed.records.push(record),
                            Err(reason) => {
                                warn!(%source, section, reason, "Skipping malformed feed entry");
                                parsed.skipped += 1;
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parsed)
}

/// Download and parse one configured feed.
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `feed` - Feed URL plus the source and section stamped on every record
///
/// # Returns
///
/// The records of every well-formed entry. Entries without a title or link
/// are skipped and counted in the log; a request failure, non-2xx status, or
/// XML that cannot be tokenized is a [`FetchError`] naming the feed.
#[instrument(level = "info", skip(client), fields(feed = %feed.label()))]
pub async fn fetch_feed(client: &Client, feed: &FeedConfig) -> Result<Vec<ArticleRecord>, FetchError> {
    let origin = feed.label();

    let response = client
        .get(&feed.url)
        .send()
        .await
        .map_err(|error| FetchError::Request {
            origin: origin.clone(),
            error,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { origin, status });
    }

    let body = response.text().await.map_err(|error| FetchError::Decode {
        origin: origin.clone(),
        error,
    })?;
    debug!(bytes = body.len(), "Downloaded feed");

    let parsed = parse_feed(&body, feed.source, &feed.section).map_err(|e| FetchError::Feed {
        origin,
        reason: e.to_string(),
    })?;

    info!(
        count = parsed.records.len(),
        skipped = parsed.skipped,
        "Parsed feed"
    );
    Ok(parsed.records)
}
