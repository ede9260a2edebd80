//! # Board Rules
//!
//! Input limits for comments and uploads. Every check returns
//! `AppError::ValidationError` so the API layer can answer with a 400.

use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, Result};
use crate::models::{MediaKind, UploadFile};

pub const MAX_CONTENT_CHARS: usize = 500;
pub const EDIT_WINDOW_MINUTES: i64 = 60;
pub const MAX_FILES: usize = 3;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: usize = 50 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const ALLOWED_VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime"];

impl MediaKind {
    /// Classifies an allow-listed MIME type. Anything else is `None`.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if ALLOWED_IMAGE_TYPES.contains(&essence.as_str()) {
            Some(MediaKind::Image)
        } else if ALLOWED_VIDEO_TYPES.contains(&essence.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Limits applied to comment text and the edit window.
#[derive(Debug, Clone)]
pub struct ContentRules {
    pub max_chars: usize,
    pub edit_window: Duration,
    pub max_media_urls: usize,
}

impl Default for ContentRules {
    fn default() -> Self {
        Self {
            max_chars: MAX_CONTENT_CHARS,
            edit_window: Duration::minutes(EDIT_WINDOW_MINUTES),
            max_media_urls: MAX_FILES,
        }
    }
}

impl ContentRules {
    /// Trims the content and checks it is non-empty and within the limit.
    pub fn validate_content(&self, raw: &str) -> Result<String> {
        let content = raw.trim();
        if content.is_empty() {
            return Err(AppError::ValidationError("content is required".into()));
        }
        if content.chars().count() > self.max_chars {
            return Err(AppError::ValidationError(format!(
                "Content must be {} characters or less",
                self.max_chars
            )));
        }
        Ok(content.to_string())
    }

    pub fn validate_media_urls(&self, urls: Vec<String>) -> Result<Vec<String>> {
        if urls.len() > self.max_media_urls {
            return Err(AppError::ValidationError(format!(
                "at most {} media files per post",
                self.max_media_urls
            )));
        }
        if urls.iter().any(|u| u.trim().is_empty()) {
            return Err(AppError::ValidationError("media url must not be empty".into()));
        }
        Ok(urls)
    }

    /// Oldest `created_at` that may still be edited at `now`.
    pub fn edit_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.edit_window
    }

    /// The boundary itself is still editable.
    pub fn is_editable(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        created_at >= self.edit_cutoff(now)
    }
}

/// Limits applied to one upload submission.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_files: usize,
    pub max_image_bytes: usize,
    pub max_video_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_image_bytes: MAX_IMAGE_BYTES,
            max_video_bytes: MAX_VIDEO_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn ceiling(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
        }
    }

    /// Largest request body a valid submission can produce, plus room for
    /// multipart framing.
    pub fn max_body_bytes(&self) -> usize {
        self.max_files * self.max_image_bytes.max(self.max_video_bytes) + 64 * 1024
    }

    /// Rejects a batch as soon as it holds more files than allowed.
    pub fn check_count(&self, count: usize) -> Result<()> {
        if count > self.max_files {
            return Err(AppError::ValidationError(format!(
                "at most {} files can be uploaded",
                self.max_files
            )));
        }
        Ok(())
    }

    /// Checks the whole batch. The first invalid file rejects all of them.
    pub fn validate_batch(&self, files: &[UploadFile]) -> Result<()> {
        if files.is_empty() {
            return Err(AppError::ValidationError("no files selected".into()));
        }
        self.check_count(files.len())?;
        for file in files {
            let kind = MediaKind::from_mime(&file.content_type).ok_or_else(|| {
                AppError::ValidationError(format!("unsupported file type: {}", file.content_type))
            })?;
            let ceiling = self.ceiling(kind);
            if file.data.len() > ceiling {
                return Err(AppError::ValidationError(format!(
                    "file too large (max {}MB)",
                    ceiling / (1024 * 1024)
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn file(content_type: &str, len: usize) -> UploadFile {
        UploadFile {
            file_name: Some("a.bin".into()),
            content_type: content_type.into(),
            data: Bytes::from(vec![0u8; len]),
        }
    }

    #[test]
    fn content_at_limit_passes_and_over_limit_fails() {
        let rules = ContentRules::default();
        let exact = "あ".repeat(500);
        assert_eq!(rules.validate_content(&exact).unwrap(), exact);

        let over = "a".repeat(501);
        assert!(matches!(
            rules.validate_content(&over),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn blank_content_is_rejected() {
        let rules = ContentRules::default();
        assert!(rules.validate_content("   \n ").is_err());
        assert_eq!(rules.validate_content("  live music  ").unwrap(), "live music");
    }

    #[test]
    fn edit_window_boundary_is_inclusive() {
        let rules = ContentRules::default();
        let now = Utc::now();
        assert!(rules.is_editable(now - Duration::minutes(60), now));
        assert!(!rules.is_editable(now - Duration::minutes(60) - Duration::seconds(1), now));
    }

    #[test]
    fn mime_classification_ignores_parameters() {
        assert_eq!(MediaKind::from_mime("image/PNG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_mime("video/mp4; codecs=avc1"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime("application/pdf"), None);
    }

    #[test]
    fn oversized_image_rejects_the_batch() {
        let policy = UploadPolicy::default();
        let files = vec![file("image/png", 10), file("image/jpeg", MAX_IMAGE_BYTES + 1)];
        assert!(policy.validate_batch(&files).is_err());
    }

    #[test]
    fn video_gets_the_larger_ceiling() {
        let policy = UploadPolicy::default();
        let files = vec![file("video/webm", MAX_IMAGE_BYTES + 1)];
        assert!(policy.validate_batch(&files).is_ok());
        let files = vec![file("video/webm", MAX_VIDEO_BYTES + 1)];
        assert!(policy.validate_batch(&files).is_err());
    }

    #[test]
    fn unsupported_type_and_count_are_rejected() {
        let policy = UploadPolicy::default();
        assert!(policy.validate_batch(&[file("text/html", 1)]).is_err());
        assert!(policy.validate_batch(&[]).is_err());
        let four: Vec<_> = (0..4).map(|_| file("image/gif", 1)).collect();
        assert!(policy.validate_batch(&four).is_err());
    }

    #[test]
    fn count_check_allows_up_to_the_limit() {
        let policy = UploadPolicy::default();
        assert!(policy.check_count(3).is_ok());
        assert!(matches!(policy.check_count(4), Err(AppError::ValidationError(_))));
    }
}
