//! # Presentation Formatter
//!
//! Converts a resolved [`PostRecord`] plus the block's [`StyleAttributes`] into
//! a [`RenderModel`]. Both the server-rendered fragment and the editor preview
//! are built from this one function, so the two can never drift apart.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, FeedErrorKind};
use crate::models::{CategoryRef, PostId, PostRecord};
use crate::style::{ImagePosition, StyleAttributes, StyleName};

const ELLIPSIS: &str = "…";

/// User-visible strings, overridable per locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strings {
    pub no_title: String,
    pub no_posts: String,
    pub feed_error_label: String,
    pub feed_unreachable: String,
    pub feed_empty: String,
    pub feed_malformed: String,
    pub invalid_block: String,
    pub internal_error: String,
}

impl Default for Strings {
    fn default() -> Self {
        Self {
            no_title: "(no title)".into(),
            no_posts: "No posts found.".into(),
            feed_error_label: "RSS Error:".into(),
            feed_unreachable: "The feed could not be reached. Check the URL and try again.".into(),
            feed_empty: "An error has occurred, which probably means the feed is down. Try again later."
                .into(),
            feed_malformed: "The feed could not be read; it is not a valid RSS or Atom document."
                .into(),
            invalid_block: "This block has invalid settings.".into(),
            internal_error: "Something went wrong while loading posts.".into(),
        }
    }
}

/// What to show in place of the post list when fetching failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Short bold prefix (feed errors only)
    pub label: Option<String>,
    pub message: String,
}

/// A category chip under a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryChip {
    pub name: String,
    pub slug: String,
    pub permalink: String,
}

/// Where the date sits relative to the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DatePlacement {
    BeforeTitle,
    AfterTitle,
}

/// Both representations of one stored instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDate {
    /// ISO-8601, for the `datetime` attribute
    pub iso: String,
    /// Locale formatted, for display
    pub readable: String,
}

/// Render-ready view of one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderModel {
    pub id: PostId,
    pub title: String,
    pub title_is_placeholder: bool,
    pub permalink: String,
    pub excerpt_plain_text: String,
    pub truncated_excerpt: String,
    pub date: Option<PostDate>,
    pub date_placement: DatePlacement,
    pub date_class: &'static str,
    pub categories: Vec<CategoryChip>,
    pub featured_image_url: Option<String>,
    pub item_class: String,
    pub image_class: String,
    pub content_class: String,
    pub show_excerpt: bool,
    pub show_date: bool,
    pub show_categories: bool,
    pub read_more: Option<String>,
}

pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

/// Formatter configuration: localized strings and the human date format.
#[derive(Debug, Clone)]
pub struct Formatter {
    strings: Strings,
    date_format: String,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(Strings::default(), DEFAULT_DATE_FORMAT)
    }
}

impl Formatter {
    /// `date_format` is a chrono `strftime` pattern.
    pub fn new(strings: Strings, date_format: impl Into<String>) -> Self {
        Self { strings, date_format: date_format.into() }
    }

    pub fn strings(&self) -> &Strings {
        &self.strings
    }

    pub fn format(&self, post: &PostRecord, style: &StyleAttributes) -> RenderModel {
        let title = plain_text(&post.title);
        let title_is_placeholder = title.is_empty();
        let title = if title_is_placeholder { self.strings.no_title.clone() } else { title };

        let excerpt_source = if post.excerpt_html.trim().is_empty() {
            &post.content_html
        } else {
            &post.excerpt_html
        };
        let excerpt_plain_text = plain_text(excerpt_source);
        let truncated_excerpt = trim_words(&excerpt_plain_text, style.excerpt_word_limit);

        let has_image = post.featured_image_url.as_deref().is_some_and(|u| !u.is_empty());
        let vertical = style.style_name().is_vertical();

        RenderModel {
            id: post.id,
            title,
            title_is_placeholder,
            permalink: post.permalink.clone(),
            excerpt_plain_text,
            truncated_excerpt,
            date: post.published_at.map(|at| self.date(at)),
            date_placement: if vertical { DatePlacement::BeforeTitle } else { DatePlacement::AfterTitle },
            date_class: if vertical { "mb-1" } else { "mt-2" },
            categories: post.categories.iter().map(chip).collect(),
            featured_image_url: post.featured_image_url.clone().filter(|_| has_image),
            item_class: item_class(style, has_image),
            image_class: image_class(style),
            content_class: content_class(style, has_image),
            show_excerpt: style.display_post_content(),
            show_date: style.display_post_date && post.published_at.is_some(),
            show_categories: style.display_category && !post.categories.is_empty(),
            read_more: style
                .display_post_link()
                .then(|| style.post_link_label.clone()),
        }
    }

    /// Formats one instant both ways so the two strings cannot disagree.
    /// An unusable `date_format` falls back to [`DEFAULT_DATE_FORMAT`].
    pub fn date(&self, at: DateTime<Utc>) -> PostDate {
        let mut readable = String::new();
        if write!(readable, "{}", at.format(&self.date_format)).is_err() {
            log::warn!("invalid date format {:?}, using the default", self.date_format);
            readable = at.format(DEFAULT_DATE_FORMAT).to_string();
        }
        PostDate { iso: at.format("%Y-%m-%dT%H:%M:%S%:z").to_string(), readable }
    }

    /// The message shown instead of the posts when fetching failed.
    pub fn notice(&self, error: &AppError) -> Notice {
        let s = &self.strings;
        match error {
            AppError::Feed { kind, .. } => Notice {
                label: Some(s.feed_error_label.clone()),
                message: match kind {
                    FeedErrorKind::Unreachable => s.feed_unreachable.clone(),
                    FeedErrorKind::Empty => s.feed_empty.clone(),
                    FeedErrorKind::Malformed => s.feed_malformed.clone(),
                },
            },
            AppError::Fetch(_) | AppError::NotFound(..) => {
                Notice { label: None, message: s.no_posts.clone() }
            }
            AppError::ValidationError(_) => Notice { label: None, message: s.invalid_block.clone() },
            AppError::Conflict(_) | AppError::Internal(_) => {
                Notice { label: None, message: s.internal_error.clone() }
            }
        }
    }

    pub fn empty_notice(&self) -> Notice {
        Notice { label: None, message: self.strings.no_posts.clone() }
    }
}

fn chip(category: &CategoryRef) -> CategoryChip {
    CategoryChip {
        name: plain_text(&category.name),
        slug: category.slug.clone(),
        permalink: category.permalink.clone(),
    }
}

fn item_class(style: &StyleAttributes, has_image: bool) -> String {
    let mut class = String::from("flex flex-auto items-stretch w-full mt-0 mb-3 ml-0 pl-0");
    match style.style_name() {
        StyleName::Horizontal if style.list_image_position == ImagePosition::Right => {
            class.push_str(" flex-row-reverse")
        }
        StyleName::Horizontal => {}
        StyleName::Stacked | StyleName::Featured => class.push_str(" flex-col"),
    }
    if has_image {
        class.push_str(" has-featured-image");
    }
    class
}

fn image_class(style: &StyleAttributes) -> String {
    let mut class = String::from("wp-block-coblocks-posts__image table flex-0 relative");
    if style.style_name() == StyleName::Horizontal {
        class.push_str(match style.list_image_position {
            ImagePosition::Left => " mr-3",
            ImagePosition::Right => " ml-3",
        });
        if !style.image_size_class.is_empty() {
            class.push(' ');
            class.push_str(&style.image_size_class);
        }
    } else {
        class.push_str(" mb-2 w-full");
    }
    if !style.display_thumbnail {
        class.push_str(" hidden");
    }
    class
}

fn content_class(style: &StyleAttributes, has_image: bool) -> String {
    let mut class = String::from("wp-block-coblocks-posts__content flex flex-col w-full");
    if style.style_name() == StyleName::Horizontal
        && !style.display_post_content()
        && style.columns() <= 2
        && has_image
    {
        class.push_str(" self-center");
    }
    class
}

/// First `limit` whitespace-separated words joined by single spaces, with an
/// ellipsis only when words were actually dropped.
pub fn trim_words(text: &str, limit: u32) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let limit = limit as usize;
    if words.len() > limit {
        let mut trimmed = words[..limit].join(" ");
        trimmed.push_str(ELLIPSIS);
        trimmed
    } else {
        words.join(" ")
    }
}

/// Strips tags (dropping `<script>`/`<style>` bodies), decodes entities and
/// trims surrounding whitespace.
pub fn plain_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let tag = &rest[start..];
        // Only `<` followed by a letter, `/` or `!` opens a tag.
        if !tag[1..].starts_with(|c: char| c.is_ascii_alphabetic() || c == '/' || c == '!') {
            text.push('<');
            rest = &tag[1..];
            continue;
        }
        let Some(end) = tag.find('>') else {
            // Unterminated tag: drop the remainder.
            rest = "";
            break;
        };
        let name = tag[1..end]
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        rest = &tag[end + 1..];
        if !tag.starts_with("</") && (name == "script" || name == "style") {
            let closing = format!("</{name}");
            rest = match rest.to_ascii_lowercase().find(&closing) {
                Some(close) => rest[close..].find('>').map_or("", |gt| &rest[close + gt + 1..]),
                None => "",
            };
        } else if is_block_tag(&name) {
            text.push(' ');
        }
    }
    text.push_str(rest);
    html_escape::decode_html_entities(&text).trim().to_string()
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "br" | "div" | "li" | "ul" | "ol" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            | "blockquote" | "tr" | "td" | "th" | "figure" | "figcaption" | "section"
    )
}
