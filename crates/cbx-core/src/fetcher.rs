//! Feed fetcher.
//!
//! Produces the flat, deduplicated, ordered list of posts for a block, either
//! from the local content store (one query per post type, concatenated in
//! type order) or from an external syndication feed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::criteria::SelectionCriteria;
use crate::error::{AppError, FeedErrorKind, Result};
use crate::models::{FeedSource, PostId, PostQuery, PostRecord};
use crate::traits::{ContentStore, FeedClient};

/// Bounded retry with exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; `1` disables retries
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self { max_attempts: 1, base_delay: Duration::ZERO }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(200) }
    }
}

pub struct FeedFetcher {
    store: Arc<dyn ContentStore>,
    feeds: Arc<dyn FeedClient>,
    retry: RetryPolicy,
}

impl FeedFetcher {
    pub fn new(store: Arc<dyn ContentStore>, feeds: Arc<dyn FeedClient>) -> Self {
        Self { store, feeds, retry: RetryPolicy::default() }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Dispatches on the block's feed source.
    ///
    /// `embedding_post` is the post the block is placed in; it never shows up
    /// in its own internal feed.
    pub async fn fetch(
        &self,
        source: &FeedSource,
        criteria: &SelectionCriteria,
        embedding_post: Option<PostId>,
    ) -> Result<Vec<PostRecord>> {
        match source {
            FeedSource::Internal => self.fetch_internal(criteria, embedding_post).await,
            FeedSource::External { url } => self.fetch_external(url, criteria.limit()).await,
        }
    }

    pub async fn fetch_internal(
        &self,
        criteria: &SelectionCriteria,
        embedding_post: Option<PostId>,
    ) -> Result<Vec<PostRecord>> {
        let exclude: Vec<PostId> = embedding_post.into_iter().collect();
        let mut posts: Vec<PostRecord> = Vec::new();

        for post_type in criteria.post_types() {
            let query = PostQuery {
                post_type: post_type.clone(),
                include: criteria.explicit_post_ids().to_vec(),
                exclude: exclude.clone(),
                category_ids: criteria.category_ids().to_vec(),
                featured_term_ids: criteria.featured_term_ids().to_vec(),
                order: criteria.order(),
                order_by: criteria.order_by(),
                limit: criteria.limit(),
                offset: criteria.offset(),
            };
            let (store, query) = (&self.store, &query);
            let batch = self
                .retrying(move || async move {
                    store
                        .query_posts(query)
                        .await
                        .map_err(|e| AppError::Fetch(format!("{e:#}")))
                })
                .await?;

            for post in batch {
                if !posts.iter().any(|p| p.id == post.id) {
                    posts.push(post);
                }
            }
        }

        if criteria.has_explicit_posts() {
            let ids = criteria.explicit_post_ids();
            posts.sort_by_key(|p| ids.iter().position(|id| *id == p.id).unwrap_or(usize::MAX));
        }

        // Truncate after concatenation so every type got its own `limit` query.
        posts.truncate(criteria.limit() as usize);
        Ok(posts)
    }

    pub async fn fetch_external(&self, url: &str, limit: u32) -> Result<Vec<PostRecord>> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::ValidationError("external feed URL is empty".into()));
        }

        let feeds = &self.feeds;
        let mut items = self.retrying(move || feeds.fetch_feed(url)).await?;
        if items.is_empty() {
            return Err(AppError::feed(FeedErrorKind::Empty, format!("{url} has no items")));
        }
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn retrying<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    log::warn!("attempt {} failed ({e}), retrying in {delay:?}", attempt + 1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::RawSelection;
    use crate::traits::{MockContentStore, MockFeedClient};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn post(id: PostId) -> PostRecord {
        PostRecord {
            id,
            title: format!("Post {id}"),
            excerpt_html: String::new(),
            content_html: String::new(),
            permalink: format!("https://example.com/?p={id}"),
            published_at: None,
            categories: Vec::new(),
            featured_image_url: None,
        }
    }

    fn criteria(post_types: &[&str], selected: &[PostId], limit: i64) -> SelectionCriteria {
        SelectionCriteria::resolve(&RawSelection {
            post_types: post_types.iter().map(|s| s.to_string()).collect(),
            selected_posts: selected.to_vec(),
            order: "desc".into(),
            order_by: "date".into(),
            limit,
            offset: 3,
            ..Default::default()
        })
        .unwrap()
    }

    fn fetcher(store: MockContentStore, feeds: MockFeedClient) -> FeedFetcher {
        FeedFetcher::new(Arc::new(store), Arc::new(feeds))
            .with_retry(RetryPolicy { max_attempts: 3, base_delay: Duration::ZERO })
    }

    #[tokio::test]
    async fn concatenates_per_type_then_truncates() {
        let mut store = MockContentStore::new();
        store.expect_query_posts().times(2).returning(|q| {
            assert_eq!(q.limit, 3);
            Ok(match q.post_type.as_str() {
                "post" => vec![post(1), post(2), post(3)],
                "page" => vec![post(10), post(11)],
                other => panic!("unexpected post type {other}"),
            })
        });

        let posts = fetcher(store, MockFeedClient::new())
            .fetch_internal(&criteria(&["post", "page"], &[], 3), None)
            .await
            .unwrap();
        let ids: Vec<PostId> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn later_types_fill_when_earlier_are_short() {
        let mut store = MockContentStore::new();
        store.expect_query_posts().returning(|q| {
            Ok(match q.post_type.as_str() {
                "post" => vec![post(1)],
                _ => vec![post(10), post(11), post(12)],
            })
        });

        let posts = fetcher(store, MockFeedClient::new())
            .fetch_internal(&criteria(&["post", "page"], &[], 3), None)
            .await
            .unwrap();
        let ids: Vec<PostId> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 10, 11]);
    }

    #[tokio::test]
    async fn explicit_selection_keeps_pick_order() {
        let mut store = MockContentStore::new();
        store.expect_query_posts().returning(|q| {
            assert_eq!(q.include, vec![30, 10, 20]);
            assert_eq!(q.offset, 0);
            assert_eq!(q.exclude, vec![99]);
            // The store sorts by date; selection order must win anyway.
            Ok(vec![post(10), post(20), post(30)])
        });

        let posts = fetcher(store, MockFeedClient::new())
            .fetch_internal(&criteria(&[], &[30, 10, 20], 2), Some(99))
            .await
            .unwrap();
        let ids: Vec<PostId> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn duplicate_records_across_types_are_dropped() {
        let mut store = MockContentStore::new();
        store
            .expect_query_posts()
            .returning(|_| Ok(vec![post(1), post(2)]));

        let posts = fetcher(store, MockFeedClient::new())
            .fetch_internal(&criteria(&["post", "page"], &[], 10), None)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn store_outage_is_retried_then_surfaces_as_fetch_error() {
        let mut store = MockContentStore::new();
        store
            .expect_query_posts()
            .times(3)
            .returning(|_| Err(anyhow::anyhow!("connection reset")));

        let err = fetcher(store, MockFeedClient::new())
            .fetch_internal(&criteria(&[], &[], 2), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }

    #[tokio::test]
    async fn unreachable_feed_recovers_on_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let mut feeds = MockFeedClient::new();
        feeds.expect_fetch_feed().times(3).returning(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::feed(FeedErrorKind::Unreachable, "connection refused"))
            } else {
                Ok(vec![post(1), post(2), post(3)])
            }
        });

        let posts = fetcher(MockContentStore::new(), feeds)
            .fetch_external("https://example.com/feed", 2)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn malformed_feed_is_not_retried() {
        let mut feeds = MockFeedClient::new();
        feeds
            .expect_fetch_feed()
            .times(1)
            .returning(|_| Err(AppError::feed(FeedErrorKind::Malformed, "not xml")));

        let err = fetcher(MockContentStore::new(), feeds)
            .fetch_external("https://example.com/feed", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Feed { kind: FeedErrorKind::Malformed, .. }));
    }

    #[tokio::test]
    async fn empty_feed_is_distinct_from_unreachable() {
        let mut feeds = MockFeedClient::new();
        feeds.expect_fetch_feed().returning(|_| Ok(Vec::new()));

        let err = fetcher(MockContentStore::new(), feeds)
            .fetch_external("https://example.com/feed", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Feed { kind: FeedErrorKind::Empty, .. }));
    }

    #[tokio::test]
    async fn external_source_uses_feed_client() {
        let mut store = MockContentStore::new();
        store.expect_query_posts().never();
        let mut feeds = MockFeedClient::new();
        feeds
            .expect_fetch_feed()
            .withf(|url| url.to_string() == "https://example.com/feed")
            .returning(|_| Ok(vec![post(5)]));

        let source = FeedSource::External { url: "https://example.com/feed".into() };
        let posts = fetcher(store, feeds)
            .fetch(&source, &criteria(&[], &[], 2), Some(1))
            .await
            .unwrap();
        assert_eq!(posts[0].id, 5);
    }
}
