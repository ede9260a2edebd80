//! Offline cache worker.
//!
//! The browser worker script is rendered from this struct, so the cache
//! name and the pre-cached asset list are decided on the server.

use askama::Template;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflinePolicy {
    cache_name: String,
    offline_url: String,
    precache: Vec<String>,
    api_prefix: String,
}

impl OfflinePolicy {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            offline_url: "/offline.html".to_string(),
            precache: vec![
                "/".to_string(),
                "/offline.html".to_string(),
                "/manifest.json".to_string(),
            ],
            api_prefix: "/api/".to_string(),
        }
    }

    /// Renders the worker script served at `/sw.js`.
    pub fn script(&self) -> askama::Result<String> {
        WorkerScript {
            cache_name: js_literal(&self.cache_name),
            offline_url: js_literal(&self.offline_url),
            precache: js_literal(&self.precache),
            api_prefix: js_literal(&self.api_prefix),
        }
        .render()
    }
}

fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
    // strings and string lists cannot fail to serialize
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

#[derive(Template)]
#[template(path = "sw.js", escape = "none")]
struct WorkerScript {
    cache_name: String,
    offline_url: String,
    precache: String,
    api_prefix: String,
}
