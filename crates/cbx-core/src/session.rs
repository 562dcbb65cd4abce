//! Editor session catalog.
//!
//! When a block mounts, the editor loads three catalogs at once: categories,
//! featured terms and post types. The requests race; each result is applied
//! as soon as it completes, a later completion of the same kind overwrites an
//! earlier one, and nothing is applied once the view is gone.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::catalog;
use crate::models::{PostTypeDescriptor, TaxonomyTerm, CATEGORY_TAXONOMY, FEATURED_TAXONOMY};
use crate::traits::ContentStore;

/// Cooperative cancellation flag shared between a view and its requests.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Marks the view as gone; in-flight results will be discarded.
    pub fn tear_down(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// One completed catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogUpdate {
    Categories(Vec<TaxonomyTerm>),
    Featured(Vec<TaxonomyTerm>),
    PostTypes(Vec<PostTypeDescriptor>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorCatalog {
    pub categories: Vec<TaxonomyTerm>,
    pub featured: Vec<TaxonomyTerm>,
    pub post_types: Vec<PostTypeDescriptor>,
}

impl EditorCatalog {
    /// Last write wins: the newest completion replaces the previous value.
    pub fn apply(&mut self, update: CatalogUpdate) {
        match update {
            CatalogUpdate::Categories(terms) => self.categories = terms,
            CatalogUpdate::Featured(terms) => self.featured = terms,
            CatalogUpdate::PostTypes(types) => self.post_types = types,
        }
    }

    /// Applies `update` only while the view is alive. Returns whether it was applied.
    pub fn apply_if_alive(&mut self, liveness: &Liveness, update: CatalogUpdate) -> bool {
        if !liveness.is_alive() {
            log::debug!("discarding catalog result for a torn down view");
            return false;
        }
        self.apply(update);
        true
    }
}

type UpdateFuture<'a> = Pin<Box<dyn Future<Output = CatalogUpdate> + Send + 'a>>;

/// Issues the three catalog requests concurrently and applies each result in
/// completion order. A failed request degrades to an empty list.
pub async fn load_catalog(
    store: &dyn ContentStore,
    catalog: &mut EditorCatalog,
    liveness: &Liveness,
) {
    let mut pending: FuturesUnordered<UpdateFuture<'_>> = FuturesUnordered::new();
    pending.push(Box::pin(async move {
        CatalogUpdate::Categories(terms_or_empty(store, CATEGORY_TAXONOMY).await)
    }));
    pending.push(Box::pin(async move {
        CatalogUpdate::Featured(terms_or_empty(store, FEATURED_TAXONOMY).await)
    }));
    pending.push(Box::pin(async move {
        CatalogUpdate::PostTypes(catalog::list_post_types(store).await)
    }));

    while let Some(update) = pending.next().await {
        catalog.apply_if_alive(liveness, update);
    }
}

async fn terms_or_empty(store: &dyn ContentStore, taxonomy: &str) -> Vec<TaxonomyTerm> {
    match catalog::list_terms(store, taxonomy).await {
        Ok(terms) => terms,
        Err(e) => {
            log::warn!("{taxonomy} terms unavailable: {e}");
            Vec::new()
        }
    }
}
