//! # cbx-feed-http
//!
//! `FeedClient` over HTTP. RSS 2.0, Atom and JSON Feed documents are parsed
//! with `feed-rs` and mapped onto `PostRecord`s in document order.

use std::time::Duration;

use async_trait::async_trait;
use cbx_core::error::{AppError, FeedErrorKind, Result};
use cbx_core::models::{PostId, PostRecord};
use cbx_core::traits::FeedClient;
use feed_rs::model::Entry;
use sha2::{Digest, Sha256};

const USER_AGENT: &str = concat!("coblocks-extended/", env!("CARGO_PKG_VERSION"));

pub struct HttpFeedClient {
    client: reqwest::Client,
}

impl HttpFeedClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<PostRecord>> {
        let unreachable = |e: reqwest::Error| AppError::feed(FeedErrorKind::Unreachable, e.to_string());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(unreachable)?
            .error_for_status()
            .map_err(unreachable)?;
        let body = response.bytes().await.map_err(unreachable)?;

        log::debug!("fetched {} bytes from {url}", body.len());
        parse_feed(&body)
    }
}

/// Parses a feed document. A document without items is not an error here.
pub fn parse_feed(body: &[u8]) -> Result<Vec<PostRecord>> {
    let feed = feed_rs::parser::parse(body)
        .map_err(|e| AppError::feed(FeedErrorKind::Malformed, e.to_string()))?;
    Ok(feed.entries.iter().map(to_record).collect())
}

fn to_record(entry: &Entry) -> PostRecord {
    PostRecord {
        id: item_id(&entry.id),
        title: entry.title.as_ref().map(|t| t.content.clone()).unwrap_or_default(),
        excerpt_html: entry.summary.as_ref().map(|t| t.content.clone()).unwrap_or_default(),
        content_html: entry
            .content
            .as_ref()
            .and_then(|c| c.body.clone())
            .unwrap_or_default(),
        permalink: entry.links.first().map(|l| l.href.clone()).unwrap_or_default(),
        published_at: entry.published.or(entry.updated),
        categories: Vec::new(),
        featured_image_url: image_url(entry),
    }
}

/// Stable positive id derived from the item's guid.
fn item_id(guid: &str) -> PostId {
    let digest = Sha256::digest(guid.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes) & i64::MAX
}

fn image_url(entry: &Entry) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();
    thumbnail.or_else(|| {
        entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|c| {
                c.content_type
                    .as_ref()
                    .is_some_and(|mime| mime.ty() == "image")
            })
            .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
    })
}
