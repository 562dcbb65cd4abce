//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PostQuery, PostRecord, TaxonomyTerm, TitleSearch};

/// A public post type as registered in the content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTypeEntry {
    pub name: String,
    pub label: String,
}

/// Read access to the local content store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    // Catalog Operations
    /// Public post types, in registration order.
    async fn list_public_post_types(&self) -> anyhow::Result<Vec<PostTypeEntry>>;
    async fn taxonomy_exists(&self, taxonomy: &str) -> anyhow::Result<bool>;
    /// Whether `taxonomy` is registered against `post_type`.
    async fn taxonomy_has_post_type(&self, taxonomy: &str, post_type: &str) -> anyhow::Result<bool>;
    /// All terms of a taxonomy, including terms without posts.
    async fn list_terms(&self, taxonomy: &str) -> anyhow::Result<Vec<TaxonomyTerm>>;

    // Post Operations
    /// Published posts of one post type matching the query.
    async fn query_posts(&self, query: &PostQuery) -> anyhow::Result<Vec<PostRecord>>;
    /// Case-insensitive title substring search over published posts.
    /// The `any` post type searches every public type.
    async fn search_by_title(
        &self,
        title: &str,
        post_type: &str,
        limit: u32,
    ) -> anyhow::Result<TitleSearch>;
}

/// Syndication feed retrieval contract.
///
/// Unlike the store, failures here keep their [`FeedErrorKind`](crate::FeedErrorKind)
/// so callers can tell an unreachable feed from an empty one.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Retrieves and parses the feed at `url` into post records, in feed order.
    async fn fetch_feed(&self, url: &str) -> Result<Vec<PostRecord>>;
}
