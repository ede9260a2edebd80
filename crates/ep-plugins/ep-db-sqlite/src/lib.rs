//! # ep-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `ep-core` domain models.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ep_core::models::{
    ClientHash, Comment, CommentFilter, LikeAction, Municipality, MunicipalityId, NewComment,
    SortOrder,
};
use ep_core::traits::CommentRepo;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

/// Every comment read goes through this projection so `like_count` is always
/// the live count of like rows.
const COMMENT_SELECT: &str = "SELECT c.id, c.municipality_id, c.content, c.client_hash, \
     c.created_at, c.event_date, c.media_urls, \
     (SELECT COUNT(*) FROM likes l WHERE l.comment_id = c.id) AS like_count, \
     m.name AS municipality_name, m.created_at AS municipality_created_at \
     FROM comments c LEFT JOIN municipalities m ON m.id = c.municipality_id";

pub struct SqliteCommentRepo {
    pool: SqlitePool,
}

// Helpers for column conversion
fn millis_to_datetime(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {ms}"))
}

fn date_to_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Escapes LIKE wildcards so the keyword matches as a plain substring.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn row_to_comment(row: &SqliteRow) -> anyhow::Result<Comment> {
    let id = Uuid::parse_str(&row.try_get::<String, _>("id")?)?;
    let municipality_id = MunicipalityId(row.try_get("municipality_id")?);
    let event_date = row
        .try_get::<Option<String>, _>("event_date")?
        .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
        .transpose()?;
    let media_urls: Vec<String> = serde_json::from_str(&row.try_get::<String, _>("media_urls")?)?;

    let municipality = match row.try_get::<Option<String>, _>("municipality_name")? {
        Some(name) => Some(Municipality {
            id: municipality_id,
            name,
            created_at: millis_to_datetime(row.try_get("municipality_created_at")?)?,
        }),
        None => None,
    };

    Ok(Comment {
        id,
        municipality_id,
        content: row.try_get("content")?,
        like_count: row.try_get("like_count")?,
        client_hash: ClientHash(row.try_get("client_hash")?),
        created_at: millis_to_datetime(row.try_get("created_at")?)?,
        event_date,
        media_urls,
        municipality,
    })
}

fn parse_ids(raw: Vec<String>) -> anyhow::Result<Vec<Uuid>> {
    raw.iter()
        .map(|s| Uuid::parse_str(s).map_err(anyhow::Error::from))
        .collect()
}

impl SqliteCommentRepo {
    /// Connects, enables foreign keys and runs the embedded migrations.
    ///
    /// In-memory databases are pinned to a single connection that never
    /// idles out, since every new connection would see an empty database.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };
        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(url, "sqlite comment store ready");

        Ok(Self { pool })
    }

    fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CommentFilter) {
        qb.push(" WHERE 1 = 1");

        if let Some(id) = filter.municipality_id {
            qb.push(" AND c.municipality_id = ").push_bind(id.0);
        }

        if let Some(since) = filter.created_since {
            qb.push(" AND c.created_at >= ").push_bind(since.timestamp_millis());
        }

        // Either the posting day or the event day falls inside the range.
        if let Some(range) = &filter.date_range {
            qb.push(" AND ((1 = 1");
            if let Some(from) = range.created_from {
                qb.push(" AND c.created_at >= ").push_bind(from.timestamp_millis());
            }
            if let Some(until) = range.created_until {
                qb.push(" AND c.created_at < ").push_bind(until.timestamp_millis());
            }
            qb.push(") OR (c.event_date IS NOT NULL");
            if let Some(from) = range.from {
                qb.push(" AND c.event_date >= ").push_bind(date_to_text(from));
            }
            if let Some(to) = range.to {
                qb.push(" AND c.event_date <= ").push_bind(date_to_text(to));
            }
            qb.push("))");
        }

        if let Some(keyword) = &filter.keyword {
            qb.push(" AND c.content LIKE ")
                .push_bind(like_pattern(keyword))
                .push(" ESCAPE '\\'");
        }

        qb.push(match filter.sort {
            SortOrder::Newest => " ORDER BY c.created_at DESC, c.id DESC",
            SortOrder::Oldest => " ORDER BY c.created_at ASC, c.id ASC",
            SortOrder::Likes => " ORDER BY like_count DESC, c.created_at DESC",
            SortOrder::Random => "",
        });
    }
}

#[async_trait]
impl CommentRepo for SqliteCommentRepo {
    async fn list_municipalities(&self) -> anyhow::Result<Vec<Municipality>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM municipalities ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> anyhow::Result<Municipality> {
                Ok(Municipality {
                    id: MunicipalityId(row.try_get("id")?),
                    name: row.try_get("name")?,
                    created_at: millis_to_datetime(row.try_get("created_at")?)?,
                })
            })
            .collect()
    }

    async fn municipality_exists(&self, id: MunicipalityId) -> anyhow::Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM municipalities WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn list_comments(&self, filter: &CommentFilter) -> anyhow::Result<Vec<Comment>> {
        let mut qb = QueryBuilder::<Sqlite>::new(COMMENT_SELECT);
        Self::push_filter(&mut qb, filter);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_comment).collect()
    }

    async fn get_comment(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query(&format!("{COMMENT_SELECT} WHERE c.id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_comment).transpose()
    }

    async fn create_comment(&self, comment: NewComment) -> anyhow::Result<Comment> {
        sqlx::query(
            "INSERT INTO comments (id, municipality_id, content, client_hash, created_at, event_date, media_urls) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(comment.id.to_string())
        .bind(comment.municipality_id.0)
        .bind(&comment.content)
        .bind(comment.client_hash.as_str())
        .bind(comment.created_at.timestamp_millis())
        .bind(comment.event_date.map(date_to_text))
        .bind(serde_json::to_string(&comment.media_urls)?)
        .execute(&self.pool)
        .await?;

        self.get_comment(comment.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("comment {} missing after insert", comment.id))
    }

    async fn update_content(&self, id: Uuid, content: &str) -> anyhow::Result<Option<Comment>> {
        let result = sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_comment(id).await
    }

    async fn editable_ids(
        &self,
        hash: &ClientHash,
        ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM comments WHERE client_hash = ");
        qb.push_bind(hash.as_str())
            .push(" AND created_at >= ")
            .push_bind(since.timestamp_millis())
            .push(" AND id IN (");
        {
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(id.to_string());
            }
        }
        qb.push(")");

        let raw = qb.build_query_scalar::<String>().fetch_all(&self.pool).await?;
        parse_ids(raw)
    }

    /// Delete-or-insert inside one transaction. The unique index on
    /// (comment_id, client_hash) keeps concurrent toggles from double-inserting.
    async fn toggle_like(&self, comment_id: Uuid, hash: &ClientHash) -> anyhow::Result<LikeAction> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM likes WHERE comment_id = ? AND client_hash = ?")
            .bind(comment_id.to_string())
            .bind(hash.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let action = if deleted > 0 {
            LikeAction::Unliked
        } else {
            let inserted = sqlx::query(
                "INSERT INTO likes (id, comment_id, client_hash, created_at) VALUES (?, ?, ?, ?) \
                 ON CONFLICT (comment_id, client_hash) DO NOTHING",
            )
            .bind(Uuid::now_v7().to_string())
            .bind(comment_id.to_string())
            .bind(hash.as_str())
            .bind(Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted > 0 {
                LikeAction::Liked
            } else {
                // A concurrent toggle inserted the row first; this toggle flips it back.
                sqlx::query("DELETE FROM likes WHERE comment_id = ? AND client_hash = ?")
                    .bind(comment_id.to_string())
                    .bind(hash.as_str())
                    .execute(&mut *tx)
                    .await?;
                debug!(%comment_id, "like raced with a concurrent toggle");
                LikeAction::Unliked
            }
        };

        tx.commit().await?;
        Ok(action)
    }

    async fn liked_ids(&self, hash: &ClientHash, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT comment_id FROM likes WHERE client_hash = ");
        qb.push_bind(hash.as_str()).push(" AND comment_id IN (");
        {
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(id.to_string());
            }
        }
        qb.push(")");

        let raw = qb.build_query_scalar::<String>().fetch_all(&self.pool).await?;
        parse_ids(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ep_core::models::DateRange;

    async fn repo() -> SqliteCommentRepo {
        SqliteCommentRepo::new("sqlite::memory:").await.unwrap()
    }

    fn new_comment(content: &str, age: Duration, event_date: Option<NaiveDate>) -> NewComment {
        NewComment {
            id: Uuid::now_v7(),
            municipality_id: MunicipalityId(1),
            content: content.into(),
            client_hash: ClientHash("owner".into()),
            created_at: Utc::now() - age,
            event_date,
            media_urls: vec![],
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn municipalities_are_seeded() {
        let repo = repo().await;
        let list = repo.list_municipalities().await.unwrap();
        assert_eq!(list.len(), 26);
        assert_eq!(list[0].name, "宮崎市");
        assert!(repo.municipality_exists(MunicipalityId(26)).await.unwrap());
        assert!(!repo.municipality_exists(MunicipalityId(27)).await.unwrap());
    }

    #[tokio::test]
    async fn create_and_get_round_trip_with_join() {
        let repo = repo().await;
        let mut input = new_comment("Night market", Duration::zero(), Some(date(2024, 7, 20)));
        input.media_urls = vec!["/media/a.png".into()];
        let created = repo.create_comment(input.clone()).await.expect("create comment");

        assert_eq!(created.id, input.id);
        assert_eq!(created.like_count, 0);
        assert_eq!(created.event_date, Some(date(2024, 7, 20)));
        assert_eq!(created.media_urls, vec!["/media/a.png".to_string()]);
        assert_eq!(created.municipality.unwrap().name, "宮崎市");
        assert_eq!(
            created.created_at.timestamp_millis(),
            input.created_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn toggle_like_inserts_then_removes_one_row() {
        let repo = repo().await;
        let c = repo.create_comment(new_comment("Parade", Duration::zero(), None)).await.unwrap();
        let fan = ClientHash("fan".into());

        assert_eq!(repo.toggle_like(c.id, &fan).await.unwrap(), LikeAction::Liked);
        assert_eq!(repo.get_comment(c.id).await.unwrap().unwrap().like_count, 1);
        assert_eq!(repo.liked_ids(&fan, &[c.id]).await.unwrap(), vec![c.id]);

        assert_eq!(repo.toggle_like(c.id, &fan).await.unwrap(), LikeAction::Unliked);
        assert_eq!(repo.get_comment(c.id).await.unwrap().unwrap().like_count, 0);
        assert!(repo.liked_ids(&fan, &[c.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_toggles_report_what_they_did() {
        let repo = std::sync::Arc::new(repo().await);
        let id = repo
            .create_comment(new_comment("Fireworks", Duration::zero(), None))
            .await
            .unwrap()
            .id;

        let handles: Vec<_> = (0..7)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.toggle_like(id, &ClientHash("fan".into())).await })
            })
            .collect();

        let mut net = 0_i64;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                LikeAction::Liked => net += 1,
                LikeAction::Unliked => net -= 1,
            }
        }

        // seven flips from "not liked" always end liked
        let count = repo.get_comment(id).await.unwrap().unwrap().like_count;
        assert_eq!(count, 1);
        assert_eq!(net, count);
    }

    #[tokio::test]
    async fn likes_sort_uses_derived_count() {
        let repo = repo().await;
        let quiet = repo.create_comment(new_comment("quiet", Duration::zero(), None)).await.unwrap();
        let loud = repo.create_comment(new_comment("loud", Duration::minutes(5), None)).await.unwrap();
        for fan in ["a", "b"] {
            repo.toggle_like(loud.id, &ClientHash(fan.into())).await.unwrap();
        }

        let filter = CommentFilter {
            sort: SortOrder::Likes,
            ..Default::default()
        };
        let listed = repo.list_comments(&filter).await.unwrap();
        assert_eq!(listed[0].id, loud.id);
        assert_eq!(listed[0].like_count, 2);
        assert_eq!(listed[1].id, quiet.id);
    }

    #[tokio::test]
    async fn newest_and_oldest_order_by_creation() {
        let repo = repo().await;
        let older = repo.create_comment(new_comment("older", Duration::hours(2), None)).await.unwrap();
        let newer = repo.create_comment(new_comment("newer", Duration::zero(), None)).await.unwrap();

        let newest = repo.list_comments(&CommentFilter::default()).await.unwrap();
        assert_eq!(newest.iter().map(|c| c.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let oldest = repo
            .list_comments(&CommentFilter { sort: SortOrder::Oldest, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(oldest.iter().map(|c| c.id).collect::<Vec<_>>(), vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn date_range_matches_creation_or_event_date() {
        let repo = repo().await;
        // Created today, event far in the future
        let today = repo
            .create_comment(new_comment("today", Duration::zero(), Some(date(2099, 1, 1))))
            .await
            .unwrap();
        // Created long ago, event inside the range
        let by_event = repo
            .create_comment(new_comment("festival", Duration::days(400), Some(date(2030, 5, 3))))
            .await
            .unwrap();
        // Neither date inside the range
        repo.create_comment(new_comment("stale", Duration::days(400), None))
            .await
            .unwrap();

        let offset = chrono::FixedOffset::east_opt(0).unwrap();
        let range = DateRange::new(Some(date(2030, 5, 1)), Some(date(2030, 5, 3)), offset)
            .unwrap()
            .unwrap();
        let listed = repo
            .list_comments(&CommentFilter { date_range: Some(range), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![by_event.id]);

        let local_today = Utc::now().date_naive();
        let range = DateRange::new(Some(local_today), Some(local_today), offset)
            .unwrap()
            .unwrap();
        let listed = repo
            .list_comments(&CommentFilter { date_range: Some(range), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![today.id]);
    }

    #[tokio::test]
    async fn keyword_is_a_literal_substring() {
        let repo = repo().await;
        let hit = repo.create_comment(new_comment("50% off at the arcade", Duration::zero(), None)).await.unwrap();
        repo.create_comment(new_comment("500 people at the arcade", Duration::zero(), None)).await.unwrap();

        let filter = CommentFilter {
            keyword: Some("50%".into()),
            ..Default::default()
        };
        let listed = repo.list_comments(&filter).await.unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![hit.id]);
    }

    #[tokio::test]
    async fn municipality_filter_and_since() {
        let repo = repo().await;
        let mut other = new_comment("Nobeoka", Duration::zero(), None);
        other.municipality_id = MunicipalityId(3);
        let other = repo.create_comment(other).await.unwrap();
        repo.create_comment(new_comment("Miyazaki old", Duration::days(10), None)).await.unwrap();

        let listed = repo
            .list_comments(&CommentFilter {
                municipality_id: Some(MunicipalityId(3)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![other.id]);

        let listed = repo
            .list_comments(&CommentFilter {
                created_since: Some(Utc::now() - Duration::days(7)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn editable_ids_respect_owner_and_cutoff() {
        let repo = repo().await;
        let fresh = repo.create_comment(new_comment("fresh", Duration::minutes(10), None)).await.unwrap();
        let old = repo.create_comment(new_comment("old", Duration::minutes(90), None)).await.unwrap();

        let cutoff = Utc::now() - Duration::hours(1);
        let owner = ClientHash("owner".into());
        let ids = [fresh.id, old.id, Uuid::now_v7()];
        assert_eq!(repo.editable_ids(&owner, &ids, cutoff).await.unwrap(), vec![fresh.id]);
        assert!(repo
            .editable_ids(&ClientHash("stranger".into()), &ids, cutoff)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_content_reports_missing_rows() {
        let repo = repo().await;
        let c = repo.create_comment(new_comment("typo", Duration::zero(), None)).await.unwrap();

        let updated = repo.update_content(c.id, "fixed").await.unwrap().unwrap();
        assert_eq!(updated.content, "fixed");
        assert!(repo.update_content(Uuid::now_v7(), "x").await.unwrap().is_none());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a_b%c\\"), "%a\\_b\\%c\\\\%");
    }
}
