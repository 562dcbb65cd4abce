//! # cbx-api
//!
//! The web routing and orchestration layer for the Advanced Posts block.

pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;

pub use error::ApiError;
pub use handlers::AppState;

/// REST namespace the block editor talks to.
pub const API_NAMESPACE: &str = "/wp-json/coblocks-extended/v1";

/// Mounts every route under [`API_NAMESPACE`].
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(API_NAMESPACE)
            // Editor catalogs
            .route("/post-types", web::get().to(handlers::post_types))
            .route("/taxonomy-terms", web::get().to(handlers::taxonomy_terms))
            .route("/posts-by-title", web::get().to(handlers::posts_by_title))
            .route("/editor/catalog", web::get().to(handlers::editor_catalog))
            .route("/block-types", web::get().to(handlers::block_types))
            // Block output
            .route("/advanced-posts/render", web::post().to(handlers::render_block))
            .route("/advanced-posts/preview", web::post().to(handlers::preview_block)),
    );
}
