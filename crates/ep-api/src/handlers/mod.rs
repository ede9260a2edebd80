//! # ep-api Handlers
//!
//! Thin translation between HTTP and `BoardService`.

pub mod comments;
pub mod likes;
pub mod media;
pub mod pages;

use uuid::Uuid;

pub async fn health() -> &'static str {
    "OK"
}

/// Comma-separated ids. Entries that are not UUIDs cannot match anything
/// and are dropped.
pub(crate) fn parse_id_list(raw: &str) -> Vec<Uuid> {
    raw.split(',')
        .filter_map(|id| Uuid::parse_str(id.trim()).ok())
        .collect()
}

/// Treats an empty string the same as an absent field.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_skip_garbage() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let ids = parse_id_list(&format!("{a}, nope,{b},"));
        assert_eq!(ids, vec![a, b]);
    }
}
