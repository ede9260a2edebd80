//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    ClientHash, ClientSignals, Comment, CommentFilter, LikeAction, Municipality, MunicipalityId,
    NewComment,
};

/// Data persistence contract for municipalities, comments and likes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    // Municipality Operations
    async fn list_municipalities(&self) -> anyhow::Result<Vec<Municipality>>;
    async fn municipality_exists(&self, id: MunicipalityId) -> anyhow::Result<bool>;

    // Comment Operations
    async fn list_comments(&self, filter: &CommentFilter) -> anyhow::Result<Vec<Comment>>;
    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> anyhow::Result<Comment>;
    /// Replaces the content and returns the updated row, or `None` if it vanished.
    async fn update_content(&self, id: Uuid, content: &str) -> anyhow::Result<Option<Comment>>;
    /// Subset of `ids` owned by `hash` and created at or after `since`.
    async fn editable_ids(
        &self,
        hash: &ClientHash,
        ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Uuid>>;

    // Like Operations
    /// Flips the (comment, hash) like in one transaction.
    async fn toggle_like(&self, comment_id: Uuid, hash: &ClientHash) -> anyhow::Result<LikeAction>;
    async fn liked_ids(&self, hash: &ClientHash, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>>;
}

/// Media storage contract for uploads.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns the storage key.
    async fn save_upload(
        &self,
        data: bytes::Bytes,
        content_type: &str,
        file_name: Option<String>,
    ) -> anyhow::Result<String>;
    /// Returns the public URL of a stored key.
    fn public_url(&self, key: &str) -> String;
}

/// Anonymous identity contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// Derives a stable pseudo-identity for the requesting client
    fn fingerprint(&self, signals: &ClientSignals) -> ClientHash;
}
