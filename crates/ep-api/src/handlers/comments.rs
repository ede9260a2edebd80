use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use ep_core::query::parse_date;
use ep_core::{AppError, Comment, CommentDraft, ListParams, Municipality, MunicipalityId};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{non_empty, parse_id_list};
use crate::error::ApiError;
use crate::extract::ClientFingerprint;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentBody {
    pub municipality_id: Option<MunicipalityId>,
    pub content: Option<String>,
    pub event_date: Option<String>,
    pub media_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct EditCommentBody {
    pub id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditableQuery {
    pub ids: Option<String>,
}

pub async fn list_municipalities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Municipality>>, ApiError> {
    Ok(Json(state.service.municipalities().await?))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let comments = state.service.list_comments(&params).await?;
    Ok(([(header::CACHE_CONTROL, "no-store, max-age=0")], Json(comments)))
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    ClientFingerprint(hash): ClientFingerprint,
    body: Result<Json<CreateCommentBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let Json(body) = body?;
    let (Some(municipality_id), Some(content)) = (body.municipality_id, non_empty(body.content)) else {
        return Err(ApiError::bad_request("municipality_id and content are required"));
    };
    let event_date = non_empty(body.event_date)
        .map(|raw| parse_date("event_date", raw.trim()))
        .transpose()?;

    let draft = CommentDraft {
        municipality_id,
        content,
        event_date,
        media_urls: body.media_urls.unwrap_or_default(),
    };
    let comment = state.service.create_comment(draft, hash).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<Arc<AppState>>,
    ClientFingerprint(hash): ClientFingerprint,
    body: Result<Json<EditCommentBody>, JsonRejection>,
) -> Result<Json<Comment>, ApiError> {
    let Json(body) = body?;
    let (Some(id), Some(content)) = (non_empty(body.id), non_empty(body.content)) else {
        return Err(ApiError::bad_request("id and content are required"));
    };
    // a malformed id names no stored comment
    let id = Uuid::parse_str(id.trim()).map_err(|_| AppError::NotFound("Comment".into()))?;

    let comment = state.service.edit_comment(id, &content, &hash).await?;
    Ok(Json(comment))
}

pub async fn editable_ids(
    State(state): State<Arc<AppState>>,
    ClientFingerprint(hash): ClientFingerprint,
    query: Result<Query<EditableQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Query(query) = query?;
    let ids = query.ids.as_deref().map(parse_id_list).unwrap_or_default();
    let editable = state.service.editable_ids(&hash, &ids).await?;
    Ok(Json(json!({ "editable_ids": editable })))
}
