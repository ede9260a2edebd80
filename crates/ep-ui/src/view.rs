//! Display-ready projections of domain values for the templates.

use chrono::FixedOffset;
use ep_core::{Comment, ListParams, Municipality};

const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl Choice {
    fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        let selected = value == current;
        Self {
            value,
            label: label.into(),
            selected,
        }
    }
}

/// Filter form state, echoed back so the page keeps the visitor's choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub municipalities: Vec<Choice>,
    pub periods: Vec<Choice>,
    pub sorts: Vec<Choice>,
    pub date_from: String,
    pub date_to: String,
    pub keyword: String,
}

impl FilterState {
    pub fn new(params: &ListParams, municipalities: &[Municipality]) -> Self {
        let field = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_string();
        let municipality = field(&params.municipality_id);
        let period = field(&params.period);
        let sort = field(&params.sort);
        let period = if period.is_empty() { "all".to_string() } else { period };
        let sort = if sort.is_empty() { "newest".to_string() } else { sort };

        let mut options = vec![Choice::new("", "すべての市町村", &municipality)];
        options.extend(
            municipalities
                .iter()
                .map(|m| Choice::new(m.id.to_string(), m.name.clone(), &municipality)),
        );

        Self {
            municipalities: options,
            periods: [("all", "すべて"), ("today", "今日"), ("week", "1週間"), ("month", "今月")]
                .into_iter()
                .map(|(v, l)| Choice::new(v, l, &period))
                .collect(),
            sorts: [("newest", "新着順"), ("oldest", "古い順"), ("likes", "いいね順"), ("random", "ランダム")]
                .into_iter()
                .map(|(v, l)| Choice::new(v, l, &sort))
                .collect(),
            date_from: field(&params.date_from),
            date_to: field(&params.date_to),
            keyword: field(&params.keyword),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaView {
    pub url: String,
    pub is_video: bool,
}

impl MediaView {
    pub fn new(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        Self {
            url: url.to_string(),
            is_video: VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub id: String,
    pub municipality: String,
    pub content: String,
    pub like_count: i64,
    /// Creation time in board-local time
    pub posted_at: String,
    /// Empty when the post names no event date
    pub event_date: String,
    pub media: Vec<MediaView>,
}

impl CommentView {
    pub fn new(comment: &Comment, offset: FixedOffset) -> Self {
        Self {
            id: comment.id.to_string(),
            municipality: comment
                .municipality
                .as_ref()
                .map(|m| m.name.clone())
                .unwrap_or_default(),
            content: comment.content.clone(),
            like_count: comment.like_count,
            posted_at: comment
                .created_at
                .with_timezone(&offset)
                .format("%Y/%m/%d %H:%M")
                .to_string(),
            event_date: comment
                .event_date
                .map(|d| d.format("%Y/%m/%d").to_string())
                .unwrap_or_default(),
            media: comment.media_urls.iter().map(|u| MediaView::new(u)).collect(),
        }
    }
}
