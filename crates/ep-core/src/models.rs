//! # Domain Models
//!
//! These structs represent the core entities of Event Pocket.
//! Comments use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Primary key of a municipality row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MunicipalityId(pub i64);

impl fmt::Display for MunicipalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fixed administrative region used to tag and filter posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    pub id: MunicipalityId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Pseudo-identity derived from request metadata. Stands in for an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientHash(pub String);

impl ClientHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The request-available signals a fingerprint is computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSignals {
    pub ip: String,
    pub user_agent: String,
}

/// A short note about a local event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub municipality_id: MunicipalityId,
    pub content: String,
    /// Derived from the likes table, never stored on the comment itself
    pub like_count: i64,
    pub client_hash: ClientHash,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// Joined for display; absent when the row is read without the join
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality: Option<Municipality>,
}

/// A validated comment ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub id: Uuid,
    pub municipality_id: MunicipalityId,
    pub content: String,
    pub client_hash: ClientHash,
    pub created_at: DateTime<Utc>,
    pub event_date: Option<NaiveDate>,
    pub media_urls: Vec<String>,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Liked,
    Unliked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Likes,
    /// Shuffled after the fetch, not by the database
    Random,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "likes" => Ok(Self::Likes),
            "random" => Ok(Self::Random),
            other => Err(AppError::ValidationError(format!("unknown sort order: {other}"))),
        }
    }
}

/// Relative creation-time window offered by the board's quick filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(AppError::ValidationError(format!("unknown period: {other}"))),
        }
    }
}

/// Inclusive range of calendar dates. At least one bound is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// `from` converted to the first instant of that local day
    pub created_from: Option<DateTime<Utc>>,
    /// First instant of the local day after `to` (exclusive)
    pub created_until: Option<DateTime<Utc>>,
}

/// Storage-facing list query, already resolved against the clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentFilter {
    pub municipality_id: Option<MunicipalityId>,
    pub created_since: Option<DateTime<Utc>>,
    pub date_range: Option<DateRange>,
    pub keyword: Option<String>,
    pub sort: SortOrder,
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: bytes::Bytes,
}

/// Broad media category, which decides the size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Client input for a new comment, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentDraft {
    pub municipality_id: MunicipalityId,
    pub content: String,
    pub event_date: Option<NaiveDate>,
    pub media_urls: Vec<String>,
}
