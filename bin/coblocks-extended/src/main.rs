//! # CoBlocks Extended Binary
//!
//! The entry point that assembles the service: configuration, logging, the
//! content store and feed plugins, the block registry and the HTTP server.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use cbx_api::handlers::AppState;
use cbx_api::middleware::{cors_policy, security_headers, standard_middleware};
use cbx_config::Settings;
use cbx_core::registry::{default_registry, BlockCategory};
use cbx_core::{FeedFetcher, Formatter, RetryPolicy, Strings};
use cbx_db_sqlite::SqliteContentStore;
use cbx_feed_http::HttpFeedClient;

/// Categories the editor ships with; the plugin's own are placed ahead of them.
fn core_categories() -> Vec<BlockCategory> {
    vec![
        BlockCategory::new("text", "Text"),
        BlockCategory::new("media", "Media"),
        BlockCategory::new("design", "Design"),
        BlockCategory::new("widgets", "Widgets"),
        BlockCategory::new("theme", "Theme"),
        BlockCategory::new("embed", "Embeds"),
    ]
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(settings.log_level.as_str()));

    // 1. Initialize the content store
    let store = SqliteContentStore::new(&settings.database.url, settings.site_url())
        .await
        .context("failed to open the content store")?;
    store.ensure_defaults().await?;
    let store = Arc::new(store);

    // 2. Initialize the feed client
    let feeds = Arc::new(HttpFeedClient::new(settings.feed.timeout())?);

    // 3. Wire the pipeline
    let fetcher = FeedFetcher::new(store.clone(), feeds).with_retry(RetryPolicy {
        max_attempts: settings.feed.max_attempts,
        base_delay: settings.feed.retry_base_delay(),
    });
    let registry = default_registry(core_categories())?;
    log::info!(
        "registered {} block(s) in {} categories",
        registry.blocks().len(),
        registry.categories().all().len()
    );

    let state = web::Data::new(AppState {
        store,
        fetcher,
        formatter: Formatter::new(Strings::default(), settings.site.date_format.clone()),
        registry,
    });

    let bind = (settings.server.host.clone(), settings.server.port);
    log::info!("CoBlocks Extended starting on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_policy())
            .wrap(standard_middleware())
            .wrap(security_headers())
            .configure(cbx_api::configure_routes)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
