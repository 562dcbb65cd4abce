//! Block category and block type registry.
//!
//! Built once at startup and handed to whoever needs it; nothing here is a
//! process-wide singleton.

use serde::Serialize;

use crate::attributes::BLOCK_NAME;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockCategory {
    pub slug: String,
    pub title: String,
}

impl BlockCategory {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self { slug: slug.into(), title: title.into() }
    }
}

/// Ordered list of block categories; slugs are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryRegistry {
    categories: Vec<BlockCategory>,
}

impl CategoryRegistry {
    pub fn new(existing: Vec<BlockCategory>) -> Self {
        let mut registry = Self::default();
        for category in existing {
            if registry.get(&category.slug).is_none() {
                registry.categories.push(category);
            }
        }
        registry
    }

    /// Puts `leading` first, followed by every other known category in its
    /// previous order. A leading slug that was already known moves up.
    pub fn prioritize(&mut self, leading: Vec<BlockCategory>) {
        let mut categories: Vec<BlockCategory> = Vec::with_capacity(self.categories.len() + leading.len());
        for category in leading {
            if !categories.iter().any(|c| c.slug == category.slug) {
                categories.push(category);
            }
        }
        for category in self.categories.drain(..) {
            if !categories.iter().any(|c| c.slug == category.slug) {
                categories.push(category);
            }
        }
        self.categories = categories;
    }

    pub fn get(&self, slug: &str) -> Option<&BlockCategory> {
        self.categories.iter().find(|c| c.slug == slug)
    }

    pub fn all(&self) -> &[BlockCategory] {
        &self.categories
    }
}

/// A registered block type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockType {
    pub name: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub keywords: Vec<String>,
    /// Rendered on the server rather than saved as static markup
    pub dynamic: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockRegistry {
    categories: CategoryRegistry,
    blocks: Vec<BlockType>,
}

impl BlockRegistry {
    pub fn new(categories: CategoryRegistry) -> Self {
        Self { categories, blocks: Vec::new() }
    }

    pub fn register(&mut self, block: BlockType) -> Result<()> {
        if self.categories.get(&block.category).is_none() {
            return Err(AppError::ValidationError(format!(
                "block {} uses unknown category {}",
                block.name, block.category
            )));
        }
        if self.get(&block.name).is_some() {
            return Err(AppError::Conflict(format!("block {} is already registered", block.name)));
        }
        log::debug!("registered block {} in {}", block.name, block.category);
        self.blocks.push(block);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&BlockType> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn blocks(&self) -> &[BlockType] {
        &self.blocks
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }
}

/// The plugin's categories, in the order the inserter shows them.
pub fn plugin_categories() -> Vec<BlockCategory> {
    vec![
        BlockCategory::new("coblocks", "CoBlocks"),
        BlockCategory::new("coblocks-galleries", "CoBlocks Galleries"),
        BlockCategory::new("coblocks-extended", "CoBlocks Extended"),
    ]
}

pub fn advanced_posts_block() -> BlockType {
    BlockType {
        name: BLOCK_NAME.to_string(),
        title: "Advanced Posts".to_string(),
        description: "Display posts or an RSS feed as stacked or horizontal cards.".to_string(),
        category: "coblocks-extended".to_string(),
        keywords: vec!["blog".into(), "rss".into(), "latest".into()],
        dynamic: true,
    }
}

/// Registry with the plugin categories ahead of `core` ones and every block
/// of this plugin registered.
pub fn default_registry(core: Vec<BlockCategory>) -> Result<BlockRegistry> {
    let mut categories = CategoryRegistry::new(core);
    categories.prioritize(plugin_categories());
    let mut registry = BlockRegistry::new(categories);
    registry.register(advanced_posts_block())?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slugs(registry: &CategoryRegistry) -> Vec<&str> {
        registry.all().iter().map(|c| c.slug.as_str()).collect()
    }

    #[test]
    fn plugin_categories_lead_without_duplicates() {
        let mut registry = CategoryRegistry::new(vec![
            BlockCategory::new("text", "Text"),
            BlockCategory::new("coblocks-galleries", "Old title"),
            BlockCategory::new("media", "Media"),
        ]);
        registry.prioritize(plugin_categories());
        assert_eq!(
            slugs(&registry),
            vec!["coblocks", "coblocks-galleries", "coblocks-extended", "text", "media"]
        );
        assert_eq!(registry.get("coblocks-galleries").unwrap().title, "CoBlocks Galleries");
    }

    #[test]
    fn prioritize_is_idempotent() {
        let mut registry = CategoryRegistry::new(vec![BlockCategory::new("text", "Text")]);
        registry.prioritize(plugin_categories());
        let once = registry.clone();
        registry.prioritize(plugin_categories());
        assert_eq!(registry, once);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut registry = BlockRegistry::new(CategoryRegistry::default());
        let err = registry.register(advanced_posts_block()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn duplicate_block_is_a_conflict() {
        let mut registry = default_registry(Vec::new()).unwrap();
        let err = registry.register(advanced_posts_block()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(registry.blocks().len(), 1);
        assert!(registry.get(BLOCK_NAME).is_some());
    }
}
