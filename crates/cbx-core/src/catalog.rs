//! Taxonomy / post type catalog accessor.

use crate::error::{AppError, Result};
use crate::models::{PostTypeDescriptor, TaxonomyTerm, ANY_POST_TYPE, FEATURED_TAXONOMY};
use crate::traits::ContentStore;

/// Lists selectable post types, led by the synthetic "All" entry.
///
/// Fails open: if the store cannot be read the list is empty, which callers
/// must read as "unknown" rather than "no post types".
pub async fn list_post_types(store: &dyn ContentStore) -> Vec<PostTypeDescriptor> {
    match try_list_post_types(store).await {
        Ok(types) => types,
        Err(e) => {
            log::warn!("post type catalog unavailable: {e:#}");
            Vec::new()
        }
    }
}

async fn try_list_post_types(store: &dyn ContentStore) -> anyhow::Result<Vec<PostTypeDescriptor>> {
    let entries = store.list_public_post_types().await?;
    let featured_registered = store.taxonomy_exists(FEATURED_TAXONOMY).await?;

    let mut types = Vec::with_capacity(entries.len() + 1);
    types.push(PostTypeDescriptor {
        value: ANY_POST_TYPE.to_string(),
        label: "All".to_string(),
        supports_featured: false,
    });

    for entry in entries {
        let supports_featured = featured_registered
            && store.taxonomy_has_post_type(FEATURED_TAXONOMY, &entry.name).await?;
        types.push(PostTypeDescriptor {
            value: entry.name,
            label: entry.label,
            supports_featured,
        });
    }
    Ok(types)
}

/// Lists every term of `taxonomy`, empty ones included.
pub async fn list_terms(store: &dyn ContentStore, taxonomy: &str) -> Result<Vec<TaxonomyTerm>> {
    let exists = store
        .taxonomy_exists(taxonomy)
        .await
        .map_err(|e| AppError::Fetch(format!("{e:#}")))?;
    if !exists {
        return Err(AppError::NotFound("taxonomy".into(), taxonomy.to_string()));
    }
    store
        .list_terms(taxonomy)
        .await
        .map_err(|e| AppError::Fetch(format!("{e:#}")))
}
