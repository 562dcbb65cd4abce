//! # cbx-db-sqlite Implementation
//!
//! This module implements the data mapping between a small SQLite content
//! schema (post types, taxonomies, terms, posts) and the `cbx-core` domain
//! models. Only published posts are ever returned.

use std::str::FromStr;

use async_trait::async_trait;
use cbx_core::models::{
    CategoryRef, OrderBy, PostId, PostQuery, PostRecord, SortOrder, TaxonomyTerm, TitleSearch,
    ANY_POST_TYPE, CATEGORY_TAXONOMY, FEATURED_TAXONOMY,
};
use cbx_core::traits::{ContentStore, PostTypeEntry};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS post_types (
    name TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    public INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS taxonomies (
    name TEXT PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS taxonomy_post_types (
    taxonomy TEXT NOT NULL REFERENCES taxonomies(name),
    post_type TEXT NOT NULL REFERENCES post_types(name),
    PRIMARY KEY (taxonomy, post_type)
);
CREATE TABLE IF NOT EXISTS terms (
    id INTEGER PRIMARY KEY,
    taxonomy TEXT NOT NULL REFERENCES taxonomies(name),
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    parent INTEGER,
    description TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY,
    post_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'publish',
    title TEXT NOT NULL DEFAULT '',
    -- lowercased in Rust since SQLite folds ASCII case only
    title_folded TEXT NOT NULL DEFAULT '',
    slug TEXT NOT NULL,
    excerpt TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    published_at TEXT,
    featured_image TEXT
);
CREATE TABLE IF NOT EXISTS term_relationships (
    post_id INTEGER NOT NULL REFERENCES posts(id),
    term_id INTEGER NOT NULL REFERENCES terms(id),
    PRIMARY KEY (post_id, term_id)
);
CREATE INDEX IF NOT EXISTS idx_posts_type_status ON posts (post_type, status);
CREATE INDEX IF NOT EXISTS idx_terms_taxonomy ON terms (taxonomy)
"#;

const POST_COLUMNS: &str =
    "SELECT p.id, p.title, p.slug, p.excerpt, p.content, p.published_at, p.featured_image FROM posts p";

/// A post as written by seeding code or the binary's import path.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: PostId,
    pub post_type: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub featured_image: Option<String>,
    /// Anything other than `publish` is invisible to readers
    pub status: String,
}

impl NewPost {
    pub fn published(id: PostId, post_type: &str, title: &str, published_at: DateTime<Utc>) -> Self {
        Self {
            id,
            post_type: post_type.to_string(),
            title: title.to_string(),
            slug: slugify(title, id),
            excerpt: String::new(),
            content: String::new(),
            published_at: Some(published_at),
            featured_image: None,
            status: "publish".to_string(),
        }
    }
}

fn slugify(title: &str, id: PostId) -> String {
    let slug: String = title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        id.to_string()
    } else {
        slug
    }
}

pub struct SqliteContentStore {
    pool: SqlitePool,
    site_url: String,
}

impl SqliteContentStore {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    ///
    /// The pool is pinned to a single connection that never expires so that
    /// `sqlite::memory:` databases survive for the lifetime of the store.
    pub async fn new(url: &str, site_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&pool).await?;
        }
        log::info!("content store ready at {url}");

        Ok(Self { pool, site_url: site_url.trim_end_matches('/').to_string() })
    }

    // Seeding

    /// Registers the built-in post types and taxonomies unless already present.
    pub async fn ensure_defaults(&self) -> anyhow::Result<()> {
        for (name, label) in [("post", "Post"), ("page", "Page")] {
            sqlx::query("INSERT OR IGNORE INTO post_types (name, label, public) VALUES (?, ?, 1)")
                .bind(name)
                .bind(label)
                .execute(&self.pool)
                .await?;
        }
        self.register_taxonomy(CATEGORY_TAXONOMY, &["post"]).await?;
        self.register_taxonomy(FEATURED_TAXONOMY, &["post"]).await
    }

    pub async fn register_post_type(&self, name: &str, label: &str, public: bool) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO post_types (name, label, public) VALUES (?, ?, ?) \
             ON CONFLICT(name) DO UPDATE SET label = excluded.label, public = excluded.public",
        )
            .bind(name)
            .bind(label)
            .bind(public)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Registers `taxonomy` for each of `post_types`.
    pub async fn register_taxonomy(&self, taxonomy: &str, post_types: &[&str]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT OR IGNORE INTO taxonomies (name) VALUES (?)")
            .bind(taxonomy)
            .execute(&mut *tx)
            .await?;
        for post_type in post_types {
            sqlx::query("INSERT OR IGNORE INTO taxonomy_post_types (taxonomy, post_type) VALUES (?, ?)")
                .bind(taxonomy)
                .bind(*post_type)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_term(
        &self,
        id: PostId,
        taxonomy: &str,
        name: &str,
        slug: &str,
        parent: Option<PostId>,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO terms (id, taxonomy, name, slug, parent) VALUES (?, ?, ?, ?, ?)")
            .bind(id)
            .bind(taxonomy)
            .bind(name)
            .bind(slug)
            .bind(parent)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_post(&self, post: &NewPost) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO posts (id, post_type, status, title, title_folded, slug, excerpt, content, published_at, featured_image) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(post.id)
        .bind(&post.post_type)
        .bind(&post.status)
        .bind(&post.title)
        .bind(post.title.to_lowercase())
        .bind(&post.slug)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(post.published_at)
        .bind(&post.featured_image)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn assign_term(&self, post_id: PostId, term_id: PostId) -> anyhow::Result<()> {
        sqlx::query("INSERT OR IGNORE INTO term_relationships (post_id, term_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(term_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // Mapping helpers

    fn post_link(&self, slug: &str) -> String {
        format!("{}/{}/", self.site_url, slug)
    }

    fn term_link(&self, taxonomy: &str, slug: &str) -> String {
        format!("{}/{}/{}/", self.site_url, taxonomy, slug)
    }

    async fn categories_of(&self, post_id: PostId) -> anyhow::Result<Vec<CategoryRef>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, t.slug FROM term_relationships r \
             JOIN terms t ON t.id = r.term_id \
             WHERE r.post_id = ? AND t.taxonomy = ? ORDER BY t.name ASC",
        )
        .bind(post_id)
        .bind(CATEGORY_TAXONOMY)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> anyhow::Result<CategoryRef> {
                let slug: String = row.try_get("slug")?;
                Ok(CategoryRef {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    permalink: self.term_link(CATEGORY_TAXONOMY, &slug),
                    slug,
                })
            })
            .collect()
    }

    async fn to_records(&self, rows: Vec<SqliteRow>) -> anyhow::Result<Vec<PostRecord>> {
        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            let id: PostId = row.try_get("id")?;
            let slug: String = row.try_get("slug")?;
            posts.push(PostRecord {
                id,
                title: row.try_get("title")?,
                excerpt_html: row.try_get("excerpt")?,
                content_html: row.try_get("content")?,
                permalink: self.post_link(&slug),
                published_at: row.try_get("published_at")?,
                categories: self.categories_of(id).await?,
                featured_image_url: row.try_get("featured_image")?,
            });
        }
        Ok(posts)
    }
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[PostId]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

fn push_term_filter(qb: &mut QueryBuilder<'_, Sqlite>, taxonomy: &'static str, term_ids: &[PostId]) {
    if term_ids.is_empty() {
        return;
    }
    qb.push(
        " AND EXISTS (SELECT 1 FROM term_relationships r JOIN terms t ON t.id = r.term_id \
         WHERE r.post_id = p.id AND t.taxonomy = ",
    );
    qb.push_bind(taxonomy);
    qb.push(" AND r.term_id IN ");
    push_id_list(qb, term_ids);
    qb.push(")");
}

fn push_post_type_filter(qb: &mut QueryBuilder<'_, Sqlite>, post_type: &str) {
    if post_type == ANY_POST_TYPE {
        qb.push(" AND p.post_type IN (SELECT name FROM post_types WHERE public = 1)");
    } else {
        qb.push(" AND p.post_type = ");
        qb.push_bind(post_type.to_string());
    }
}

fn like_pattern(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn list_public_post_types(&self) -> anyhow::Result<Vec<PostTypeEntry>> {
        let rows = sqlx::query("SELECT name, label FROM post_types WHERE public = 1 ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> anyhow::Result<PostTypeEntry> {
                Ok(PostTypeEntry { name: row.try_get("name")?, label: row.try_get("label")? })
            })
            .collect()
    }

    async fn taxonomy_exists(&self, taxonomy: &str) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT 1 FROM taxonomies WHERE name = ?")
            .bind(taxonomy)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn taxonomy_has_post_type(&self, taxonomy: &str, post_type: &str) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT 1 FROM taxonomy_post_types WHERE taxonomy = ? AND post_type = ?")
            .bind(taxonomy)
            .bind(post_type)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Terms ordered by name, with published-post counts; empty terms are kept.
    async fn list_terms(&self, taxonomy: &str) -> anyhow::Result<Vec<TaxonomyTerm>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, t.slug, t.parent, t.description, t.taxonomy, \
             (SELECT COUNT(*) FROM term_relationships r JOIN posts p ON p.id = r.post_id \
              WHERE r.term_id = t.id AND p.status = 'publish') AS post_count \
             FROM terms t WHERE t.taxonomy = ? ORDER BY t.name ASC, t.id ASC",
        )
        .bind(taxonomy)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> anyhow::Result<TaxonomyTerm> {
                let slug: String = row.try_get("slug")?;
                let taxonomy: String = row.try_get("taxonomy")?;
                Ok(TaxonomyTerm {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    permalink: self.term_link(&taxonomy, &slug),
                    slug,
                    parent_id: row.try_get("parent")?,
                    count: row.try_get("post_count")?,
                    description: row.try_get("description")?,
                    taxonomy,
                })
            })
            .collect()
    }

    async fn query_posts(&self, query: &PostQuery) -> anyhow::Result<Vec<PostRecord>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(POST_COLUMNS);
        qb.push(" WHERE p.status = 'publish'");
        push_post_type_filter(&mut qb, &query.post_type);

        if !query.include.is_empty() {
            qb.push(" AND p.id IN ");
            push_id_list(&mut qb, &query.include);
        }
        if !query.exclude.is_empty() {
            qb.push(" AND p.id NOT IN ");
            push_id_list(&mut qb, &query.exclude);
        }
        push_term_filter(&mut qb, CATEGORY_TAXONOMY, &query.category_ids);
        push_term_filter(&mut qb, FEATURED_TAXONOMY, &query.featured_term_ids);

        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let key = match query.order_by {
            OrderBy::Date => "p.published_at",
            OrderBy::Title => "p.title COLLATE NOCASE",
        };
        qb.push(format!(" ORDER BY {key} {direction}, p.id {direction}"));
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(query.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(query.offset));

        let rows = qb.build().fetch_all(&self.pool).await?;
        self.to_records(rows).await
    }

    async fn search_by_title(
        &self,
        title: &str,
        post_type: &str,
        limit: u32,
    ) -> anyhow::Result<TitleSearch> {
        let pattern = like_pattern(&title.to_lowercase());

        let mut count: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE p.status = 'publish'");
        push_post_type_filter(&mut count, post_type);
        count.push(" AND p.title_folded LIKE ");
        count.push_bind(pattern.clone());
        count.push(" ESCAPE '\\'");
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get(0_usize)?;

        let mut page: QueryBuilder<'_, Sqlite> = QueryBuilder::new(POST_COLUMNS);
        page.push(" WHERE p.status = 'publish'");
        push_post_type_filter(&mut page, post_type);
        page.push(" AND p.title_folded LIKE ");
        page.push_bind(pattern);
        page.push(" ESCAPE '\\' ORDER BY p.published_at DESC, p.id DESC LIMIT ");
        page.push_bind(i64::from(limit));

        let rows = page.build().fetch_all(&self.pool).await?;
        Ok(TitleSearch { total, posts: self.to_records(rows).await? })
    }
}
