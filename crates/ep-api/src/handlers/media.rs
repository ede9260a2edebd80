use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use ep_core::UploadFile;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

const FILES_FIELD: &str = "files";

/// Accepts every `files` part of a multipart body. Other parts are ignored.
/// A part beyond the file limit fails the request before it is read.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let policy = state.service.upload_policy();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        policy.check_count(files.len() + 1)?;
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await?;
        files.push(UploadFile {
            file_name,
            content_type,
            data,
        });
    }

    let urls = state.service.upload(files).await?;
    Ok((StatusCode::CREATED, Json(json!({ "urls": urls }))))
}
