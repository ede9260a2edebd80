//! Server-rendered pages and the offline worker assets.

use std::sync::Arc;

use askama::Template;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use ep_core::{AppError, ListParams};
use ep_ui::{BoardTemplate, CommentView, FilterState, OfflineTemplate, APP_NAME};

use crate::error::ApiError;
use crate::state::AppState;

fn render_failed(err: askama::Error) -> ApiError {
    ApiError(AppError::Internal(format!("template rendering failed: {err}")))
}

/// The board, filtered by the same query string the list endpoint takes.
pub async fn board(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Html<String>, ApiError> {
    let params = query.map(|Query(p)| p).unwrap_or_default();
    let municipalities = state.service.municipalities().await?;

    // A rejected filter still renders the page, with the reason shown.
    let (comments, notice) = match state.service.list_comments(&params).await {
        Ok(comments) => (comments, None),
        Err(AppError::ValidationError(msg)) => (Vec::new(), Some(msg)),
        Err(e) => return Err(e.into()),
    };

    let offset = state.service.offset();
    let views: Vec<CommentView> = comments.iter().map(|c| CommentView::new(c, offset)).collect();
    let filters = FilterState::new(&params, &municipalities);

    let html = BoardTemplate {
        title: APP_NAME,
        filters: &filters,
        comments: &views,
        max_chars: state.service.rules().max_chars,
        max_files: state.service.upload_policy().max_files,
        notice: notice.as_deref(),
    }
    .render()
    .map_err(render_failed)?;
    Ok(Html(html))
}

pub async fn offline_page() -> Result<Html<String>, ApiError> {
    let html = OfflineTemplate { title: APP_NAME }.render().map_err(render_failed)?;
    Ok(Html(html))
}

pub async fn manifest() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        Json(ep_ui::web_manifest()),
    )
}

/// The worker must be revalidated on every load so a new cache version
/// takes effect.
pub async fn service_worker(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let script = state.offline.script().map_err(render_failed)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        script,
    ))
}
