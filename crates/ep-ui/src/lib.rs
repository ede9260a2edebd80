use askama::Template;
use serde_json::json;

pub mod offline;
pub mod view;

pub use offline::OfflinePolicy;
pub use view::{Choice, CommentView, FilterState, MediaView};

pub const APP_NAME: &str = "宮崎イベントポケット";

#[derive(Template)]
#[template(path = "board.html")]
pub struct BoardTemplate<'a> {
    pub title: &'a str,
    pub filters: &'a FilterState,
    pub comments: &'a [CommentView],
    pub max_chars: usize,
    pub max_files: usize,
    /// Set when the list query itself was rejected
    pub notice: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "offline.html")]
pub struct OfflineTemplate<'a> {
    pub title: &'a str,
}

/// Web app manifest served at `/manifest.json`.
pub fn web_manifest() -> serde_json::Value {
    json!({
        "name": APP_NAME,
        "short_name": "イベントポケット",
        "start_url": "/",
        "display": "standalone",
        "background_color": "#ffffff",
        "theme_color": "#ff7a00",
        "lang": "ja"
    })
}
