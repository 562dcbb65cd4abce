//! coblocks-extended/crates/cbx-core/src/lib.rs
//!
//! The central domain logic and interface definitions for the Advanced Posts
//! block: catalog access, selection criteria, feed fetching, style resolution
//! and presentation formatting.

pub mod attributes;
pub mod catalog;
pub mod criteria;
pub mod error;
pub mod fetcher;
pub mod format;
pub mod models;
pub mod registry;
pub mod session;
pub mod style;
pub mod traits;

// Re-exporting for easier access in other crates
pub use attributes::*;
pub use criteria::{RawSelection, SelectionCriteria};
pub use error::*;
pub use fetcher::{FeedFetcher, RetryPolicy};
pub use format::{Formatter, Notice, RenderModel, Strings, DEFAULT_DATE_FORMAT};
pub use models::*;
pub use style::{ClassList, ImagePosition, StyleAttributes, StyleName};
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_pipeline_without_io() {
        let attrs = BlockAttributes {
            class_name: Some("is-style-featured".into()),
            excerpt_length: 2,
            ..Default::default()
        };
        let criteria = attrs.selection_criteria().unwrap();
        assert_eq!(criteria.limit(), 2);

        let style = attrs.style_attributes().unwrap();
        let post = PostRecord {
            id: 3,
            title: "Featured".into(),
            excerpt_html: "<p>alpha beta gamma</p>".into(),
            content_html: String::new(),
            permalink: "https://example.com/featured/".into(),
            published_at: None,
            categories: Vec::new(),
            featured_image_url: None,
        };
        let model = Formatter::default().format(&post, &style);
        assert_eq!(model.truncated_excerpt, "alpha beta…");
        assert!(model.item_class.contains("flex-col"));
        assert!(!model.show_date);
    }
}
