//! # ep-api
//!
//! The web routing layer for Event Pocket: the JSON API under `/api`,
//! the server-rendered board, and the offline worker assets.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;

pub use error::ApiError;
pub use state::AppState;

/// Router options that are not part of the shared state.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Directory served under `media_route`
    pub media_dir: Option<PathBuf>,
    pub media_route: String,
    pub cors_allow_any: bool,
}

pub fn router(state: Arc<AppState>, config: &RouterConfig) -> Router {
    let upload_limit = state.service.upload_policy().max_body_bytes();

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/municipalities", get(handlers::comments::list_municipalities))
        .route(
            "/comments",
            get(handlers::comments::list_comments)
                .post(handlers::comments::create_comment)
                .patch(handlers::comments::edit_comment),
        )
        .route("/comments/editable", get(handlers::comments::editable_ids))
        .route(
            "/likes",
            get(handlers::likes::liked_ids).post(handlers::likes::toggle_like),
        )
        .route(
            "/upload",
            post(handlers::media::upload).layer(DefaultBodyLimit::max(upload_limit)),
        );

    let mut app = Router::new()
        .route("/", get(handlers::pages::board))
        .route("/offline.html", get(handlers::pages::offline_page))
        .route("/manifest.json", get(handlers::pages::manifest))
        .route("/sw.js", get(handlers::pages::service_worker))
        .nest("/api", api);

    // An absolute public URL means uploads are served by something else.
    if let Some(dir) = &config.media_dir {
        if config.media_route.starts_with('/') {
            app = app.nest_service(&config.media_route, ServeDir::new(dir));
        }
    }

    let mut app = app
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(middleware::trace_layer())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    if config.cors_allow_any {
        app = app.layer(middleware::cors_policy());
    }
    app
}
