//! # cbx-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core
//! pipeline: catalog lookups, criteria resolution, fetching and formatting.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use cbx_core::catalog;
use cbx_core::criteria::validate_post_type;
use cbx_core::registry::BlockRegistry;
use cbx_core::session::{load_catalog, EditorCatalog, Liveness};
use cbx_core::{
    AppError, BlockAttributes, CategoryRef, ContentStore, FeedFetcher, Formatter, Notice, PostId,
    PostRecord, PostTypeDescriptor, RenderModel, StyleAttributes, TaxonomyTerm, ANY_POST_TYPE,
    DEFAULT_POST_TYPE,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;

/// Page size of the posts-by-title search.
pub const TITLE_SEARCH_CAP: u32 = 24;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub fetcher: FeedFetcher,
    pub formatter: Formatter,
    pub registry: BlockRegistry,
}

// Wire shapes

#[derive(Debug, Serialize)]
pub struct PostTypeOption {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_featured: Option<bool>,
}

impl From<PostTypeDescriptor> for PostTypeOption {
    fn from(d: PostTypeDescriptor) -> Self {
        let has_featured = (d.value != ANY_POST_TYPE).then_some(d.supports_featured);
        Self { value: d.value, label: d.label, has_featured }
    }
}

#[derive(Debug, Deserialize)]
pub struct TermsParams {
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TitleParams {
    pub title: Option<String>,
    pub post_type: Option<String>,
}

/// A post as listed by the manual post picker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(rename = "ID")]
    pub id: PostId,
    pub title: String,
    pub post_link: String,
    pub date: Option<String>,
    pub date_readable: Option<String>,
    #[serde(rename = "thumbnailURL")]
    pub thumbnail_url: Option<String>,
    pub post_excerpt: String,
    pub categories: Vec<CategoryRef>,
}

#[derive(Debug, Serialize)]
pub struct TitleSearchResponse {
    pub count: i64,
    pub posts: Vec<PostSummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderRequest {
    pub attributes: BlockAttributes,
    /// The post the block is embedded in
    pub post_id: Option<PostId>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub items: Vec<RenderModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

// Catalog routes

pub async fn post_types(data: web::Data<AppState>) -> HttpResponse {
    let options: Vec<PostTypeOption> = catalog::list_post_types(data.store.as_ref())
        .await
        .into_iter()
        .map(PostTypeOption::from)
        .collect();
    HttpResponse::Ok().json(options)
}

pub async fn taxonomy_terms(
    data: web::Data<AppState>,
    params: web::Query<TermsParams>,
) -> Result<HttpResponse, ApiError> {
    let slug = required(params.slug.as_deref(), "slug")?;
    let terms: Vec<TaxonomyTerm> = catalog::list_terms(data.store.as_ref(), slug).await?;
    Ok(HttpResponse::Ok().json(terms))
}

pub async fn posts_by_title(
    data: web::Data<AppState>,
    params: web::Query<TitleParams>,
) -> Result<HttpResponse, ApiError> {
    let title = required(params.title.as_deref(), "title")?;
    let post_type = params
        .post_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_POST_TYPE);
    validate_post_type(post_type)?;

    let found = data
        .store
        .search_by_title(title, post_type, TITLE_SEARCH_CAP)
        .await
        .map_err(|e| AppError::Fetch(format!("{e:#}")))?;

    let posts = found.posts.iter().map(|p| summarize(&data.formatter, p)).collect();
    Ok(HttpResponse::Ok().json(TitleSearchResponse { count: found.total, posts }))
}

pub async fn editor_catalog(data: web::Data<AppState>) -> HttpResponse {
    let mut snapshot = EditorCatalog::default();
    load_catalog(data.store.as_ref(), &mut snapshot, &Liveness::new()).await;
    HttpResponse::Ok().json(snapshot)
}

pub async fn block_types(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "categories": data.registry.categories().all(),
        "blocks": data.registry.blocks(),
    }))
}

// Block output routes

/// What the block shows: formatted posts, or a notice in their place.
enum Outcome {
    Posts(Vec<RenderModel>),
    Notice(Notice),
}

/// Shared by the server render and the editor preview so both always agree.
async fn resolve_block(
    data: &AppState,
    request: &RenderRequest,
) -> Result<(StyleAttributes, Outcome), ApiError> {
    let attributes = &request.attributes;
    // Settings are validated before any fetch happens.
    let criteria = attributes.selection_criteria()?;
    let style = attributes.style_attributes()?;
    let source = attributes.feed_source();

    let outcome = match data.fetcher.fetch(&source, &criteria, request.post_id).await {
        Ok(posts) if posts.is_empty() => Outcome::Notice(data.formatter.empty_notice()),
        Ok(posts) => Outcome::Posts(posts.iter().map(|p| data.formatter.format(p, &style)).collect()),
        Err(e @ AppError::ValidationError(_)) => return Err(e.into()),
        Err(e) => {
            log::warn!("advanced posts fetch failed: {e}");
            Outcome::Notice(data.formatter.notice(&e))
        }
    };
    Ok((style, outcome))
}

pub async fn render_block(
    data: web::Data<AppState>,
    body: web::Json<RenderRequest>,
) -> Result<HttpResponse, ApiError> {
    let (style, outcome) = resolve_block(&data, &body).await?;
    let html = match outcome {
        Outcome::Posts(models) => cbx_ui::render_block(&style, &models)?,
        Outcome::Notice(notice) => cbx_ui::render_notice(&notice)?,
    };
    Ok(HttpResponse::Ok().content_type("text/html; charset=utf-8").body(html))
}

pub async fn preview_block(
    data: web::Data<AppState>,
    body: web::Json<RenderRequest>,
) -> Result<HttpResponse, ApiError> {
    let (_, outcome) = resolve_block(&data, &body).await?;
    let response = match outcome {
        Outcome::Posts(items) => PreviewResponse { items, notice: None },
        Outcome::Notice(notice) => PreviewResponse { items: Vec::new(), notice: Some(notice) },
    };
    Ok(HttpResponse::Ok().json(response))
}

// Helpers

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError(AppError::ValidationError(format!("missing parameter: {name}"))))
}

fn summarize(formatter: &Formatter, post: &PostRecord) -> PostSummary {
    let date = post.published_at.map(|at| formatter.date(at));
    PostSummary {
        id: post.id,
        title: post.title.clone(),
        post_link: post.permalink.clone(),
        date_readable: date.as_ref().map(|d| d.readable.clone()),
        date: date.map(|d| d.iso),
        thumbnail_url: post.featured_image_url.clone(),
        post_excerpt: cbx_core::format::plain_text(if post.excerpt_html.trim().is_empty() {
            &post.content_html
        } else {
            &post.excerpt_html
        }),
        categories: post.categories.clone(),
    }
}
