//! # BoardService
//!
//! Orchestrates the ports. Validation and the owner/edit-window checks live
//! here so every adapter gets the same behaviour.

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use rand::seq::SliceRandom;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    ClientHash, Comment, CommentDraft, LikeAction, Municipality, NewComment, SortOrder, UploadFile,
};
use crate::query::ListParams;
use crate::rules::{ContentRules, UploadPolicy};
use crate::traits::{CommentRepo, MediaStore};

pub struct BoardService {
    repo: Arc<dyn CommentRepo>,
    media: Arc<dyn MediaStore>,
    rules: ContentRules,
    uploads: UploadPolicy,
    offset: FixedOffset,
}

impl BoardService {
    pub fn new(repo: Arc<dyn CommentRepo>, media: Arc<dyn MediaStore>) -> Self {
        Self {
            repo,
            media,
            rules: ContentRules::default(),
            uploads: UploadPolicy::default(),
            offset: Utc.fix(),
        }
    }

    pub fn with_rules(mut self, rules: ContentRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_upload_policy(mut self, uploads: UploadPolicy) -> Self {
        self.uploads = uploads;
        self
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn rules(&self) -> &ContentRules {
        &self.rules
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.uploads
    }

    /// Offset used to interpret calendar dates and local days.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub async fn municipalities(&self) -> Result<Vec<Municipality>> {
        Ok(self.repo.list_municipalities().await?)
    }

    pub async fn list_comments(&self, params: &ListParams) -> Result<Vec<Comment>> {
        let filter = params.resolve(Utc::now(), self.offset)?;
        let mut comments = self.repo.list_comments(&filter).await?;
        if filter.sort == SortOrder::Random {
            comments.shuffle(&mut rand::rng());
        }
        debug!(count = comments.len(), sort = ?filter.sort, "listed comments");
        Ok(comments)
    }

    pub async fn create_comment(&self, draft: CommentDraft, hash: ClientHash) -> Result<Comment> {
        let content = self.rules.validate_content(&draft.content)?;
        let media_urls = self.rules.validate_media_urls(draft.media_urls)?;

        if !self.repo.municipality_exists(draft.municipality_id).await? {
            return Err(AppError::ValidationError(format!(
                "unknown municipality_id: {}",
                draft.municipality_id
            )));
        }

        let comment = self
            .repo
            .create_comment(NewComment {
                id: Uuid::now_v7(),
                municipality_id: draft.municipality_id,
                content,
                client_hash: hash,
                created_at: Utc::now(),
                event_date: draft.event_date,
                media_urls,
            })
            .await?;

        info!(comment_id = %comment.id, municipality_id = %comment.municipality_id, "comment created");
        Ok(comment)
    }

    /// Replaces the content of a comment owned by `hash`, while the edit
    /// window is still open.
    pub async fn edit_comment(&self, id: Uuid, content: &str, hash: &ClientHash) -> Result<Comment> {
        let content = self.rules.validate_content(content)?;

        let existing = self
            .repo
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment".into()))?;

        if existing.client_hash != *hash {
            return Err(AppError::Forbidden("Not authorized".into()));
        }
        if !self.rules.is_editable(existing.created_at, Utc::now()) {
            return Err(AppError::Forbidden(format!(
                "Edit time expired ({} minute limit)",
                self.rules.edit_window.num_minutes()
            )));
        }

        let updated = self
            .repo
            .update_content(id, &content)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment".into()))?;

        info!(comment_id = %id, "comment edited");
        Ok(updated)
    }

    pub async fn editable_ids(&self, hash: &ClientHash, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let since = self.rules.edit_cutoff(Utc::now());
        Ok(self.repo.editable_ids(hash, ids, since).await?)
    }

    pub async fn toggle_like(&self, comment_id: Uuid, hash: &ClientHash) -> Result<LikeAction> {
        if self.repo.get_comment(comment_id).await?.is_none() {
            return Err(AppError::NotFound("Comment".into()));
        }
        let action = self.repo.toggle_like(comment_id, hash).await?;
        debug!(%comment_id, ?action, "like toggled");
        Ok(action)
    }

    pub async fn liked_ids(&self, hash: &ClientHash, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repo.liked_ids(hash, ids).await?)
    }

    /// Stores a validated batch and returns one public URL per file, in order.
    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<String>> {
        self.uploads.validate_batch(&files)?;

        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            let size = file.data.len();
            let key = self
                .media
                .save_upload(file.data, &file.content_type, file.file_name)
                .await?;
            info!(%key, size, content_type = %file.content_type, "media stored");
            urls.push(self.media.public_url(&key));
        }
        Ok(urls)
    }
}
