//! event-pocket/crates/ep-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Event Pocket.

pub mod error;
pub mod models;
pub mod query;
pub mod rules;
pub mod service;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use query::ListParams;
pub use rules::{ContentRules, UploadPolicy};
pub use service::BoardService;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use uuid::Uuid;

    #[test]
    fn comment_serializes_with_flat_ids() {
        let id = Uuid::now_v7();
        let comment = Comment {
            id,
            municipality_id: MunicipalityId(3),
            content: "Fireworks at the river tonight".to_string(),
            like_count: 2,
            client_hash: ClientHash("abc12345".to_string()),
            created_at: chrono::Utc::now(),
            event_date: chrono::NaiveDate::from_ymd_opt(2024, 8, 1),
            media_urls: vec![],
            municipality: None,
        };
        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["municipality_id"], 3);
        assert_eq!(json["client_hash"], "abc12345");
        assert_eq!(json["event_date"], "2024-08-01");
        assert!(json.get("municipality").is_none());
    }

    #[test]
    fn like_action_uses_lowercase_tags() {
        assert_eq!(serde_json::to_value(LikeAction::Liked).unwrap(), "liked");
        assert_eq!(serde_json::to_value(LikeAction::Unliked).unwrap(), "unliked");
    }
}
