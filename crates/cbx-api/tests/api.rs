use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use cbx_api::middleware::{cors_policy, security_headers, standard_middleware};
use cbx_api::{configure_routes, AppState, API_NAMESPACE};
use cbx_core::registry::default_registry;
use cbx_core::{
    AppError, FeedClient, FeedErrorKind, FeedFetcher, Formatter, MockFeedClient, PostRecord,
    RetryPolicy, CATEGORY_TAXONOMY, FEATURED_TAXONOMY,
};
use cbx_db_sqlite::{NewPost, SqliteContentStore};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

async fn seeded_store() -> SqliteContentStore {
    let store = SqliteContentStore::new("sqlite::memory:", "https://example.com").await.unwrap();
    store.register_post_type("post", "Post", true).await.unwrap();
    store.register_post_type("page", "Page", true).await.unwrap();
    store.register_taxonomy(CATEGORY_TAXONOMY, &["post"]).await.unwrap();
    store.register_taxonomy(FEATURED_TAXONOMY, &["post"]).await.unwrap();
    store.insert_term(5, CATEGORY_TAXONOMY, "News", "news", None).await.unwrap();
    store.insert_term(9, CATEGORY_TAXONOMY, "Sports", "sports", None).await.unwrap();
    store.insert_term(20, FEATURED_TAXONOMY, "Editor pick", "editor-pick", None).await.unwrap();

    let posts = [
        (1, "post", "Alpha", 3, Some(5)),
        (2, "post", "Bravo", 2, Some(5)),
        (3, "post", "Charlie", 1, Some(9)),
        (4, "page", "Alpha page", 4, None),
    ];
    for (id, post_type, title, day, category) in posts {
        let mut post = NewPost::published(id, post_type, title, Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap());
        post.excerpt = format!("<p>{title} body text here</p>");
        store.insert_post(&post).await.unwrap();
        if let Some(term) = category {
            store.assign_term(id, term).await.unwrap();
        }
    }
    store.assign_term(1, 20).await.unwrap();
    store
}

async fn state_with(feeds: MockFeedClient) -> web::Data<AppState> {
    let store = Arc::new(seeded_store().await);
    let feeds: Arc<dyn FeedClient> = Arc::new(feeds);
    let fetcher = FeedFetcher::new(store.clone(), feeds).with_retry(RetryPolicy::none());
    web::Data::new(AppState {
        store,
        fetcher,
        formatter: Formatter::default(),
        registry: default_registry(Vec::new()).unwrap(),
    })
}

async fn state() -> web::Data<AppState> {
    state_with(MockFeedClient::new()).await
}

fn url(path: &str) -> String {
    format!("{API_NAMESPACE}{path}")
}

fn render_request(attributes: Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri(&url("/advanced-posts/render"))
        .set_json(json!({ "attributes": attributes }))
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack.find(needle).unwrap_or_else(|| panic!("{needle} not found in {haystack}"))
}

#[actix_web::test]
async fn test_post_types_start_with_any() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let req = test::TestRequest::get().uri(&url("/post-types")).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        body,
        json!([
            {"value": "any", "label": "All"},
            {"value": "post", "label": "Post", "has_featured": true},
            {"value": "page", "label": "Page", "has_featured": false},
        ])
    );
}

#[actix_web::test]
async fn test_taxonomy_terms() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;

    let req = test::TestRequest::get().uri(&url("/taxonomy-terms?slug=category")).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["slug"], "news");
    assert_eq!(body[0]["count"], 2);
    assert_eq!(body[0]["parent"], Value::Null);
    assert_eq!(body[0]["link"], "https://example.com/category/news/");
    assert_eq!(body[0]["taxonomy"], "category");

    let req = test::TestRequest::get().uri(&url("/taxonomy-terms")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_request");

    let req = test::TestRequest::get().uri(&url("/taxonomy-terms?slug=genre")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_posts_by_title() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;

    let req = test::TestRequest::get().uri(&url("/posts-by-title?title=ALPHA&post_type=any")).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["posts"][0]["ID"], 4);
    assert_eq!(body["posts"][1]["postLink"], "https://example.com/alpha/");
    assert_eq!(body["posts"][1]["postExcerpt"], "Alpha body text here");
    assert_eq!(body["posts"][1]["dateReadable"], "January 3, 2024");

    let req = test::TestRequest::get().uri(&url("/posts-by-title?title=alpha")).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);

    let req = test::TestRequest::get().uri(&url("/posts-by-title?post_type=post")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_render_filters_orders_and_is_deterministic() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let attributes = json!({ "categories": ["5"] });

    let resp = test::call_service(&app, render_request(attributes.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("content-type").unwrap().to_str().unwrap().starts_with("text/html"));
    let first = test::read_body(resp).await;

    let html = std::str::from_utf8(&first).unwrap();
    assert!(position(html, ">Alpha</a>") < position(html, ">Bravo</a>"));
    assert!(!html.contains("Charlie"));

    let second = test::call_and_read_body(&app, render_request(attributes).to_request()).await;
    assert_eq!(first, second);
}

#[actix_web::test]
async fn test_render_excludes_embedding_post() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let req = test::TestRequest::post()
        .uri(&url("/advanced-posts/render"))
        .set_json(json!({ "attributes": { "categories": ["5"] }, "postId": 1 }))
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains(">Bravo</a>"));
    assert!(!html.contains(">Alpha</a>"));
}

#[actix_web::test]
async fn test_render_keeps_manual_selection_order() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let attributes = json!({ "selectedPosts": [{"ID": 3}, {"ID": 1}], "offset": "5" });
    let body = test::call_and_read_body(&app, render_request(attributes).to_request()).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(position(html, ">Charlie</a>") < position(html, ">Alpha</a>"));
    assert!(!html.contains(">Bravo</a>"));
}

#[actix_web::test]
async fn test_render_rejects_invalid_settings() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let resp = test::call_service(&app, render_request(json!({ "postsToShow": 0 })).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_request");
}

#[actix_web::test]
async fn test_render_empty_selection_shows_notice() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let attributes = json!({ "categories": ["9"], "featureds": ["20"] });
    let body = test::call_and_read_body(&app, render_request(attributes).to_request()).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("No posts found."));
    assert!(!html.contains("<strong>"));
}

#[actix_web::test]
async fn test_render_unreachable_feed_shows_rss_error() {
    let mut feeds = MockFeedClient::new();
    feeds
        .expect_fetch_feed()
        .times(1)
        .returning(|_| Err(AppError::feed(FeedErrorKind::Unreachable, "connection refused")));
    let app = test::init_service(App::new().app_data(state_with(feeds).await).configure(configure_routes)).await;

    let attributes = json!({ "postFeedType": "external", "externalRssUrl": "https://feeds.example.com/rss" });
    let resp = test::call_service(&app, render_request(attributes).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("<strong>RSS Error:</strong>"));
    assert!(html.contains("could not be reached"));
}

#[actix_web::test]
async fn test_render_external_feed() {
    let mut feeds = MockFeedClient::new();
    feeds.expect_fetch_feed().returning(|_| {
        Ok((1..=3)
            .map(|n| PostRecord {
                id: n,
                title: format!("Feed item {n}"),
                excerpt_html: String::new(),
                content_html: "<p>From the feed</p>".into(),
                permalink: format!("https://feeds.example.com/{n}"),
                published_at: None,
                categories: Vec::new(),
                featured_image_url: None,
            })
            .collect())
    });
    let app = test::init_service(App::new().app_data(state_with(feeds).await).configure(configure_routes)).await;

    let attributes = json!({ "postFeedType": "external", "externalRssUrl": "https://feeds.example.com/rss" });
    let body = test::call_and_read_body(&app, render_request(attributes).to_request()).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(position(html, ">Feed item 1</a>") < position(html, ">Feed item 2</a>"));
    assert!(!html.contains("Feed item 3"));
    assert!(html.contains("From the feed"));
    assert!(!html.contains("<time"));
}

#[actix_web::test]
async fn test_preview_agrees_with_render() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let attributes = json!({ "categories": ["5"], "excerptLength": 2 });

    let req = test::TestRequest::post()
        .uri(&url("/advanced-posts/preview"))
        .set_json(json!({ "attributes": attributes.clone() }))
        .to_request();
    let preview: Value = test::call_and_read_body_json(&app, req).await;
    let items = preview["items"].as_array().unwrap();
    assert_eq!(items.iter().map(|i| i["id"].as_i64().unwrap()).collect::<Vec<_>>(), vec![1, 2]);
    assert!(preview.get("notice").is_none());

    let body = test::call_and_read_body(&app, render_request(attributes).to_request()).await;
    let html = std::str::from_utf8(&body).unwrap();
    for item in items {
        assert!(html.contains(&format!(">{}</a>", item["title"].as_str().unwrap())));
        assert!(html.contains(item["truncatedExcerpt"].as_str().unwrap()));
        assert!(html.contains(item["itemClass"].as_str().unwrap()));
    }
    assert_eq!(items[0]["truncatedExcerpt"], "Alpha body…");
}

#[actix_web::test]
async fn test_preview_reports_notice() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;
    let req = test::TestRequest::post()
        .uri(&url("/advanced-posts/preview"))
        .set_json(json!({ "attributes": { "selectedPostTypes": ["page"], "categories": ["5"] } }))
        .to_request();
    let preview: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(preview["items"], json!([]));
    assert_eq!(preview["notice"]["message"], "No posts found.");
}

#[actix_web::test]
async fn test_editor_catalog_and_block_types() {
    let app = test::init_service(App::new().app_data(state().await).configure(configure_routes)).await;

    let req = test::TestRequest::get().uri(&url("/editor/catalog")).to_request();
    let catalog: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(catalog["categories"].as_array().unwrap().len(), 2);
    assert_eq!(catalog["featured"][0]["slug"], "editor-pick");
    assert_eq!(catalog["postTypes"].as_array().unwrap().len(), 3);

    let req = test::TestRequest::get().uri(&url("/block-types")).to_request();
    let types: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(types["blocks"][0]["name"], "coblocks/advanced-posts");
    assert_eq!(types["categories"][0]["slug"], "coblocks");
}

#[actix_web::test]
async fn test_standard_middleware_stack() {
    let app = test::init_service(
        App::new()
            .app_data(state().await)
            .wrap(cors_policy())
            .wrap(standard_middleware())
            .wrap(security_headers())
            .configure(configure_routes),
    )
    .await;
    let req = test::TestRequest::get().uri(&url("/post-types")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
}
