//! # Domain Models
//!
//! These structs represent the content entities the Advanced Posts block
//! reads: catalog entries (post types, taxonomy terms) and the resolved,
//! display-ready post records produced by the feed fetcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric content identifier, as assigned by the content store.
pub type PostId = i64;

/// Slug of the taxonomy used for the "featured" filter.
pub const FEATURED_TAXONOMY: &str = "featured";

/// Slug of the built-in category taxonomy.
pub const CATEGORY_TAXONOMY: &str = "category";

/// Post type used when nothing (or the `any` sentinel) is selected.
pub const DEFAULT_POST_TYPE: &str = "post";

/// Synthetic catalog value standing for "all post types".
pub const ANY_POST_TYPE: &str = "any";

/// A selectable post type in the editor catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTypeDescriptor {
    /// The post type slug (e.g., "post", "page")
    pub value: String,
    /// Singular display label
    pub label: String,
    /// Whether the "featured" taxonomy is registered for this post type
    #[serde(rename = "has_featured")]
    pub supports_featured: bool,
}

/// A term of some taxonomy (category, featured, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub id: PostId,
    pub name: String,
    pub slug: String,
    #[serde(rename = "parent")]
    pub parent_id: Option<PostId>,
    /// Number of published posts attached to the term (zero is kept)
    pub count: i64,
    pub description: String,
    #[serde(rename = "link")]
    pub permalink: String,
    pub taxonomy: String,
}

/// A category attached to a post, as shown in the category chips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: PostId,
    pub name: String,
    pub slug: String,
    pub permalink: String,
}

/// A resolved post, either read from the local store or mapped from a feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    /// Raw excerpt markup; may be empty
    pub excerpt_html: String,
    /// Raw body markup, used when the excerpt is empty
    pub content_html: String,
    pub permalink: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Ordered category list; always empty for feed items
    pub categories: Vec<CategoryRef>,
    pub featured_image_url: Option<String>,
}

/// Where a block instance reads its posts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedSource {
    Internal,
    External { url: String },
}

/// Sort direction for internal queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Sort key for internal queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    #[default]
    Date,
    Title,
}

/// A single per-post-type store query, as issued by the feed fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub post_type: String,
    /// Restrict to these ids when non-empty
    pub include: Vec<PostId>,
    pub exclude: Vec<PostId>,
    /// OR across the listed categories; ignored when empty
    pub category_ids: Vec<PostId>,
    /// OR across the listed featured terms; ignored when empty
    pub featured_term_ids: Vec<PostId>,
    pub order: SortOrder,
    pub order_by: OrderBy,
    pub limit: u32,
    pub offset: u32,
}

/// Result of a title search: total matches plus the capped page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSearch {
    pub total: i64,
    pub posts: Vec<PostRecord>,
}
