//! Persisted attribute set of an Advanced Posts block.
//!
//! Every attribute is optional on the wire; the defaults below are the only
//! place they are spelled out. From a deserialized set the block derives its
//! [`FeedSource`], [`SelectionCriteria`] and [`StyleAttributes`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::criteria::{RawSelection, SelectionCriteria};
use crate::error::Result;
use crate::models::{FeedSource, PostId};
use crate::style::{ImagePosition, StyleAttributes};

/// Registered name of the block.
pub const BLOCK_NAME: &str = "coblocks/advanced-posts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostFeedType {
    #[default]
    Internal,
    External,
}

/// A manually picked post; the editor stores whole post objects, only the
/// id matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPost {
    #[serde(rename = "ID")]
    pub id: PostId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockAttributes {
    pub class_name: Option<String>,
    pub align: Option<String>,
    pub post_feed_type: PostFeedType,
    pub external_rss_url: String,
    pub posts_to_show: i64,
    pub display_post_content: bool,
    pub display_post_date: bool,
    pub display_first_post_image: bool,
    pub display_thumbnail: bool,
    pub display_post_link: bool,
    pub display_category: bool,
    pub post_link: String,
    pub excerpt_length: u32,
    pub image_size: String,
    pub list_position: ImagePosition,
    pub columns: u32,
    pub order: String,
    pub order_by: String,
    pub categories: Vec<String>,
    pub selected_posts: Vec<SelectedPost>,
    #[serde(deserialize_with = "lenient_int")]
    pub offset: i64,
    pub selected_post_types: Vec<String>,
    pub featureds: Vec<String>,
    pub user_modified_columns: Option<bool>,
}

impl Default for BlockAttributes {
    fn default() -> Self {
        Self {
            class_name: None,
            align: None,
            post_feed_type: PostFeedType::Internal,
            external_rss_url: String::new(),
            posts_to_show: 2,
            display_post_content: true,
            display_post_date: true,
            display_first_post_image: false,
            display_thumbnail: true,
            display_post_link: false,
            display_category: false,
            post_link: "Read more".to_string(),
            excerpt_length: 12,
            image_size: "w-1/7 sm:w-1/5 h-1/7 sm:h-1/5".to_string(),
            list_position: ImagePosition::Right,
            columns: 2,
            order: "desc".to_string(),
            order_by: "date".to_string(),
            categories: Vec::new(),
            selected_posts: Vec::new(),
            offset: 0,
            selected_post_types: Vec::new(),
            featureds: Vec::new(),
            user_modified_columns: None,
        }
    }
}

impl BlockAttributes {
    /// External only when the feed type says so and a URL was entered.
    pub fn feed_source(&self) -> FeedSource {
        match self.post_feed_type {
            PostFeedType::External if !self.external_rss_url.trim().is_empty() => {
                FeedSource::External { url: self.external_rss_url.trim().to_string() }
            }
            _ => FeedSource::Internal,
        }
    }

    pub fn raw_selection(&self) -> RawSelection {
        RawSelection {
            post_types: self.selected_post_types.clone(),
            category_ids: self.categories.clone(),
            featured_term_ids: self.featureds.clone(),
            selected_posts: self.selected_posts.iter().map(|p| p.id).collect(),
            order: self.order.clone(),
            order_by: self.order_by.clone(),
            offset: self.offset,
            limit: self.posts_to_show,
        }
    }

    pub fn selection_criteria(&self) -> Result<SelectionCriteria> {
        SelectionCriteria::resolve(&self.raw_selection())
    }

    pub fn style_attributes(&self) -> Result<StyleAttributes> {
        let mut style = StyleAttributes::restore(
            self.class_name.as_deref().unwrap_or_default(),
            self.columns,
            self.user_modified_columns,
        )?;
        style.set_display_first_post_image(self.display_first_post_image);
        style.set_display_post_content(self.display_post_content);
        style.set_display_post_link(self.display_post_link);
        style.list_image_position = self.list_position;
        style.image_size_class = self.image_size.clone();
        style.display_thumbnail = self.display_thumbnail;
        style.display_post_date = self.display_post_date;
        style.display_category = self.display_category;
        style.excerpt_word_limit = self.excerpt_length;
        style.align = self.align.clone();
        style.post_link_label = self.post_link.clone();
        Ok(style)
    }
}

/// The editor persists `offset` as a string; older blocks store a number.
fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        String(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(n) => Ok(n),
        IntOrString::String(s) if s.trim().is_empty() => Ok(0),
        IntOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
