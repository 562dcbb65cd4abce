//! Selection criteria resolver.
//!
//! Turns the raw editor state (toggled post types, category/featured id
//! strings with placeholder entries, picked posts, ordering, offset, limit)
//! into one immutable [`SelectionCriteria`]. Validation happens here so that
//! no query is ever issued for a rejected selection.

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{OrderBy, PostId, SortOrder, ANY_POST_TYPE, DEFAULT_POST_TYPE};

/// Largest number of posts a block may request.
pub const MAX_LIMIT: u32 = 100;

/// Raw selection state as the editor holds it.
#[derive(Debug, Clone, Default)]
pub struct RawSelection {
    pub post_types: Vec<String>,
    /// Category ids as strings; `""` entries are placeholders
    pub category_ids: Vec<String>,
    /// Featured term ids as strings; `""` entries are placeholders
    pub featured_term_ids: Vec<String>,
    /// Manually picked posts, in pick order
    pub selected_posts: Vec<PostId>,
    pub order: String,
    pub order_by: String,
    pub offset: i64,
    pub limit: i64,
}

/// The normalized, validated query descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionCriteria {
    explicit_post_ids: Vec<PostId>,
    post_types: Vec<String>,
    category_ids: Vec<PostId>,
    featured_term_ids: Vec<PostId>,
    order: SortOrder,
    order_by: OrderBy,
    limit: u32,
    offset: u32,
}

impl SelectionCriteria {
    pub fn resolve(raw: &RawSelection) -> Result<Self> {
        let category_ids = parse_ids("category", &raw.category_ids)?;
        let featured_term_ids = parse_ids("featured term", &raw.featured_term_ids)?;
        let post_types = normalize_post_types(&raw.post_types)?;
        let order = parse_order(&raw.order)?;
        let order_by = parse_order_by(&raw.order_by)?;

        let limit = u32::try_from(raw.limit)
            .ok()
            .filter(|l| (1..=MAX_LIMIT).contains(l))
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "limit must be between 1 and {MAX_LIMIT}, got {}",
                    raw.limit
                ))
            })?;
        let offset = u32::try_from(raw.offset).map_err(|_| {
            AppError::ValidationError(format!("offset must be non-negative, got {}", raw.offset))
        })?;

        let mut explicit_post_ids: Vec<PostId> = Vec::with_capacity(raw.selected_posts.len());
        for id in &raw.selected_posts {
            if !explicit_post_ids.contains(id) {
                explicit_post_ids.push(*id);
            }
        }

        // Explicit picks win over offset and define the limit.
        let (limit, offset) = if explicit_post_ids.is_empty() {
            (limit, offset)
        } else {
            let count = explicit_post_ids.len() as u32;
            if count > MAX_LIMIT {
                return Err(AppError::ValidationError(format!(
                    "at most {MAX_LIMIT} posts can be selected, got {count}"
                )));
            }
            (count, 0)
        };

        Ok(Self {
            explicit_post_ids,
            post_types,
            category_ids,
            featured_term_ids,
            order,
            order_by,
            limit,
            offset,
        })
    }

    pub fn explicit_post_ids(&self) -> &[PostId] {
        &self.explicit_post_ids
    }

    pub fn has_explicit_posts(&self) -> bool {
        !self.explicit_post_ids.is_empty()
    }

    pub fn post_types(&self) -> &[String] {
        &self.post_types
    }

    pub fn category_ids(&self) -> &[PostId] {
        &self.category_ids
    }

    pub fn featured_term_ids(&self) -> &[PostId] {
        &self.featured_term_ids
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn order_by(&self) -> OrderBy {
        self.order_by
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

fn parse_ids(what: &str, raw: &[String]) -> Result<Vec<PostId>> {
    let mut ids = Vec::new();
    for value in raw.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        let id: PostId = value
            .parse()
            .map_err(|_| AppError::ValidationError(format!("invalid {what} id {value:?}")))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// `any` stands for the default post type, not every type.
fn normalize_post_types(raw: &[String]) -> Result<Vec<String>> {
    let mut types: Vec<String> = Vec::new();
    for value in raw {
        let value = value.trim();
        let resolved = if value == ANY_POST_TYPE {
            DEFAULT_POST_TYPE
        } else {
            validate_post_type(value)?;
            value
        };
        if !types.iter().any(|t| t == resolved) {
            types.push(resolved.to_string());
        }
    }
    if types.is_empty() {
        types.push(DEFAULT_POST_TYPE.to_string());
    }
    Ok(types)
}

/// Post type keys are at most 20 lowercase alphanumerics, `_` or `-`.
pub fn validate_post_type(value: &str) -> Result<()> {
    let well_formed = !value.is_empty()
        && value.len() <= 20
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if well_formed {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!("malformed post type {value:?}")))
    }
}

fn parse_order(raw: &str) -> Result<SortOrder> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" | "" => Ok(SortOrder::Desc),
        other => Err(AppError::ValidationError(format!("unknown order {other:?}"))),
    }
}

fn parse_order_by(raw: &str) -> Result<OrderBy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "date" | "" => Ok(OrderBy::Date),
        "title" => Ok(OrderBy::Title),
        other => Err(AppError::ValidationError(format!("unknown orderBy {other:?}"))),
    }
}
