//! # cbx-ui
//!
//! Server-side markup for the Advanced Posts block. Templates receive values
//! that are already HTML-escaped, so they are compiled with escaping off.

use askama::Template;
use cbx_core::format::{CategoryChip, DatePlacement};
use cbx_core::{Notice, RenderModel, StyleAttributes};

fn esc(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

pub struct CategoryView {
    pub name: String,
    pub slug: String,
    pub permalink: String,
}

impl From<&CategoryChip> for CategoryView {
    fn from(chip: &CategoryChip) -> Self {
        Self { name: esc(&chip.name), slug: esc(&chip.slug), permalink: esc(&chip.permalink) }
    }
}

/// One list item, escaped and flattened for the template.
pub struct PostView {
    pub title: String,
    pub permalink: String,
    pub item_class: String,
    pub image_class: String,
    pub content_class: String,
    pub has_image: bool,
    pub image_url: String,
    pub show_categories: bool,
    pub categories: Vec<CategoryView>,
    pub date_before_title: bool,
    pub date_after_title: bool,
    pub date_iso: String,
    pub date_readable: String,
    pub date_class: &'static str,
    pub show_excerpt: bool,
    pub excerpt: String,
    pub has_read_more: bool,
    pub read_more: String,
}

impl From<&RenderModel> for PostView {
    fn from(model: &RenderModel) -> Self {
        let date = model.date.as_ref().filter(|_| model.show_date);
        let (date_iso, date_readable) =
            date.map_or((String::new(), String::new()), |d| (esc(&d.iso), esc(&d.readable)));
        Self {
            title: esc(&model.title),
            permalink: esc(&model.permalink),
            item_class: esc(&model.item_class),
            image_class: esc(&model.image_class),
            content_class: esc(&model.content_class),
            has_image: model.featured_image_url.is_some(),
            image_url: esc(model.featured_image_url.as_deref().unwrap_or_default()),
            show_categories: model.show_categories,
            categories: model.categories.iter().map(CategoryView::from).collect(),
            date_before_title: date.is_some() && model.date_placement == DatePlacement::BeforeTitle,
            date_after_title: date.is_some() && model.date_placement == DatePlacement::AfterTitle,
            date_iso,
            date_readable,
            date_class: model.date_class,
            show_excerpt: model.show_excerpt,
            excerpt: esc(&model.truncated_excerpt),
            has_read_more: model.read_more.is_some(),
            read_more: esc(model.read_more.as_deref().unwrap_or_default()),
        }
    }
}

#[derive(Template)]
#[template(path = "advanced_posts.html", escape = "none")]
pub struct AdvancedPostsTemplate<'a> {
    pub wrapper_class: String,
    pub list_class: String,
    pub posts: &'a [PostView],
}

#[derive(Template)]
#[template(path = "notice.html", escape = "none")]
pub struct NoticeTemplate {
    pub has_label: bool,
    pub label: String,
    pub message: String,
}

/// Renders the block fragment for already formatted posts.
pub fn render_block(style: &StyleAttributes, models: &[RenderModel]) -> askama::Result<String> {
    let posts: Vec<PostView> = models.iter().map(PostView::from).collect();
    AdvancedPostsTemplate {
        wrapper_class: esc(&style.wrapper_class()),
        list_class: esc(&style.list_class()),
        posts: &posts,
    }
    .render()
}

/// Renders the placeholder shown when no posts can be displayed.
pub fn render_notice(notice: &Notice) -> askama::Result<String> {
    NoticeTemplate {
        has_label: notice.label.is_some(),
        label: esc(notice.label.as_deref().unwrap_or_default()),
        message: esc(&notice.message),
    }
    .render()
}
