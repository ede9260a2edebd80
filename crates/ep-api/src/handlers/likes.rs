use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use ep_core::{AppError, LikeAction};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{non_empty, parse_id_list};
use crate::error::ApiError;
use crate::extract::ClientFingerprint;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleLikeBody {
    pub comment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LikedQuery {
    pub comment_ids: Option<String>,
}

pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    ClientFingerprint(hash): ClientFingerprint,
    body: Result<Json<ToggleLikeBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body?;
    let Some(comment_id) = non_empty(body.comment_id) else {
        return Err(ApiError::bad_request("comment_id is required"));
    };
    let comment_id =
        Uuid::parse_str(comment_id.trim()).map_err(|_| AppError::NotFound("Comment".into()))?;

    let action = state.service.toggle_like(comment_id, &hash).await?;
    let status = match action {
        LikeAction::Liked => StatusCode::CREATED,
        LikeAction::Unliked => StatusCode::OK,
    };
    Ok((status, Json(json!({ "success": true, "action": action }))))
}

pub async fn liked_ids(
    State(state): State<Arc<AppState>>,
    ClientFingerprint(hash): ClientFingerprint,
    query: Result<Query<LikedQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let Some(raw) = non_empty(query.comment_ids) else {
        return Err(ApiError::bad_request("comment_ids is required"));
    };
    let liked = state.service.liked_ids(&hash, &parse_id_list(&raw)).await?;
    Ok(Json(json!({ "liked_ids": liked })))
}
