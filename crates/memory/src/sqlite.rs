//! SQLite memory store.
//!
//! Canonical layout: one `agent_memories` table with `importance`,
//! `decay_factor`, and `last_accessed` as first-class columns. The
//! `metadata` column carries caller-supplied extras only. (The earlier
//! metadata-packed layout is supported through the explicit adapter in
//! [`crate::legacy`].)
//!
//! Decay and the recall touch-update are each a single UPDATE statement,
//! so the documented recall/decay race stays a pair of atomic, monotone
//! field updates rather than read-modify-write round trips.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use roost_core::error::MemoryError;
use roost_core::memory::{
    DECAY_STEP, MemoryDraft, MemoryFilter, MemoryRanker, MemoryRecord, MemoryStore,
    RECALL_DECAY_FLOOR, RecencyRanker,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::legacy::LegacyMemoryRow;

/// A production SQLite memory store.
pub struct SqliteMemoryStore {
    pool: SqlitePool,
    ranker: Arc<dyn MemoryRanker>,
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    // Fixed-width fractional seconds keep lexical order == chronological order.
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

impl SqliteMemoryStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and all tables/indexes are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self {
            pool,
            ranker: Arc::new(RecencyRanker),
        };
        store.run_migrations().await?;
        info!("SQLite memory store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (shared with the rest of the app).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let store = Self {
            pool,
            ranker: Arc::new(RecencyRanker),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Swap the recall ranking strategy. The default keeps the
    /// importance/recency order and ignores the query.
    pub fn with_ranker(mut self, ranker: Arc<dyn MemoryRanker>) -> Self {
        self.ranker = ranker;
        self
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_memories (
                id            TEXT PRIMARY KEY,
                agent_id      TEXT NOT NULL,
                kind          TEXT NOT NULL,
                content       TEXT NOT NULL,
                importance    INTEGER NOT NULL DEFAULT 5,
                decay_factor  REAL,
                last_accessed TEXT,
                metadata      TEXT NOT NULL DEFAULT '{}',
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL,
                workspace_id  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("agent_memories table: {e}")))?;

        // Covers the recall ordering (importance desc, created_at desc)
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_agent_memories_recall
            ON agent_memories(agent_id, importance DESC, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("recall index: {e}")))?;

        // Covers the decay threshold scan
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_agent_memories_last_accessed
            ON agent_memories(agent_id, last_accessed)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("last_accessed index: {e}")))?;

        debug!("SQLite memory migrations complete");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<MemoryRecord, MemoryError> {
        let col = |name: &str, e: sqlx::Error| MemoryError::QueryFailed(format!("{name}: {e}"));

        let id: String = row.try_get("id").map_err(|e| col("id column", e))?;
        let agent_id: String = row
            .try_get("agent_id")
            .map_err(|e| col("agent_id column", e))?;
        let kind: String = row.try_get("kind").map_err(|e| col("kind column", e))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| col("content column", e))?;
        let importance: i64 = row
            .try_get("importance")
            .map_err(|e| col("importance column", e))?;
        let decay_factor: Option<f64> = row
            .try_get("decay_factor")
            .map_err(|e| col("decay_factor column", e))?;
        let last_accessed: Option<String> = row
            .try_get("last_accessed")
            .map_err(|e| col("last_accessed column", e))?;
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| col("metadata column", e))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| col("created_at column", e))?;
        let updated_at: String = row
            .try_get("updated_at")
            .map_err(|e| col("updated_at column", e))?;
        let workspace_id: String = row
            .try_get("workspace_id")
            .map_err(|e| col("workspace_id column", e))?;

        Ok(MemoryRecord {
            id: Uuid::parse_str(&id)
                .map_err(|e| MemoryError::QueryFailed(format!("id parse: {e}")))?,
            agent_id: Uuid::parse_str(&agent_id)
                .map_err(|e| MemoryError::QueryFailed(format!("agent_id parse: {e}")))?,
            kind,
            content,
            importance: importance as i32,
            decay_factor,
            last_accessed: last_accessed.as_deref().and_then(parse_ts),
            metadata: serde_json::from_str(&metadata_json)
                .unwrap_or(serde_json::Value::Object(serde_json::Map::new())),
            created_at: parse_ts(&created_at).unwrap_or_else(Utc::now),
            updated_at: parse_ts(&updated_at).unwrap_or_else(Utc::now),
            workspace_id: Uuid::parse_str(&workspace_id).unwrap_or(Uuid::nil()),
        })
    }

    // ── Fallible inner operations ─────────────────────────────────────────

    async fn try_recall(
        &self,
        agent_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM agent_memories
            WHERE agent_id = ?1
              AND (decay_factor IS NULL OR decay_factor > ?2)
            ORDER BY importance DESC, created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(agent_id.to_string())
        .bind(RECALL_DECAY_FLOOR)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("recall: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    /// Refresh `last_accessed` on the given records in one statement.
    async fn touch(&self, ids: &[Uuid]) -> Result<(), MemoryError> {
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "UPDATE agent_memories SET last_accessed = ?1, updated_at = ?1 WHERE id IN ({})",
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql).bind(fmt_ts(Utc::now()));
        for id in ids {
            query = query.bind(id.to_string());
        }

        query
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("touch: {e}")))?;
        Ok(())
    }

    async fn try_save(&self, draft: &MemoryDraft) -> Result<Uuid, MemoryError> {
        let id = Uuid::new_v4();
        let now = fmt_ts(Utc::now());
        let metadata = serde_json::to_string(&draft.metadata)
            .map_err(|e| MemoryError::Storage(format!("metadata serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO agent_memories
                (id, agent_id, kind, content, importance, decay_factor,
                 last_accessed, metadata, created_at, updated_at, workspace_id)
            VALUES (?1, ?2, ?3, ?4, ?5, 1.0, ?6, ?7, ?6, ?6, ?8)
            "#,
        )
        .bind(id.to_string())
        .bind(draft.agent_id.to_string())
        .bind(&draft.kind)
        .bind(&draft.content)
        .bind(draft.clamped_importance())
        .bind(&now)
        .bind(&metadata)
        .bind(draft.workspace_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("save: {e}")))?;

        Ok(id)
    }

    async fn try_decay(&self, agent_id: Uuid, days_threshold: i64) -> Result<u64, MemoryError> {
        let cutoff = fmt_ts(Utc::now() - Duration::days(days_threshold));

        // ROUND(.., 1) keeps decay on the one-decimal lattice so ten passes
        // take 1.0 to exactly 0.0, never negative.
        let result = sqlx::query(
            r#"
            UPDATE agent_memories
            SET decay_factor = ROUND(MAX(COALESCE(decay_factor, 1.0) - ?1, 0.0), 1),
                updated_at = ?2
            WHERE agent_id = ?3
              AND (last_accessed IS NULL OR last_accessed < ?4)
              AND COALESCE(decay_factor, 1.0) > 0.0
            "#,
        )
        .bind(DECAY_STEP)
        .bind(fmt_ts(Utc::now()))
        .bind(agent_id.to_string())
        .bind(&cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("decay: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn try_cleanup(&self, agent_id: Uuid) -> Result<u64, MemoryError> {
        let result =
            sqlx::query("DELETE FROM agent_memories WHERE agent_id = ?1 AND decay_factor <= 0.0")
                .bind(agent_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| MemoryError::Storage(format!("cleanup: {e}")))?;

        Ok(result.rows_affected())
    }

    /// Bulk-import rows from the metadata-packed legacy layout.
    ///
    /// Ids and timestamps are preserved; the packed decay state moves into
    /// the canonical columns. Returns the number of rows imported.
    pub async fn import_legacy(&self, rows: Vec<LegacyMemoryRow>) -> Result<u64, MemoryError> {
        let mut imported = 0;
        for row in rows {
            let record = row.unpack();
            let metadata = serde_json::to_string(&record.metadata)
                .map_err(|e| MemoryError::Storage(format!("metadata serialization: {e}")))?;

            sqlx::query(
                r#"
                INSERT INTO agent_memories
                    (id, agent_id, kind, content, importance, decay_factor,
                     last_accessed, metadata, created_at, updated_at, workspace_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(record.id.to_string())
            .bind(record.agent_id.to_string())
            .bind(&record.kind)
            .bind(&record.content)
            .bind(record.importance)
            .bind(record.decay_factor)
            .bind(record.last_accessed.map(fmt_ts))
            .bind(&metadata)
            .bind(fmt_ts(record.created_at))
            .bind(fmt_ts(record.updated_at))
            .bind(record.workspace_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("legacy import: {e}")))?;

            imported += 1;
        }

        info!(rows = imported, "Imported legacy memory rows");
        Ok(imported)
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn recall(&self, agent_id: Uuid, query: &str, limit: usize) -> Vec<MemoryRecord> {
        let mut records = match self.try_recall(agent_id, limit).await {
            Ok(records) => records,
            Err(e) => {
                warn!(%agent_id, error = %e, "Memory recall failed, returning empty");
                return Vec::new();
            }
        };

        // Pluggable ranking seam — the default ranker ignores the query.
        self.ranker.rerank(query, &mut records);

        // Touch failure must not fail the recall itself.
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        if let Err(e) = self.touch(&ids).await {
            warn!(%agent_id, error = %e, "last_accessed touch failed");
        }

        records
    }

    async fn save(&self, draft: MemoryDraft) -> Option<Uuid> {
        match self.try_save(&draft).await {
            Ok(id) => {
                debug!(%id, agent_id = %draft.agent_id, kind = %draft.kind, "Stored memory");
                Some(id)
            }
            Err(e) => {
                warn!(agent_id = %draft.agent_id, error = %e, "Memory save failed");
                None
            }
        }
    }

    async fn decay_old_memories(&self, agent_id: Uuid, days_threshold: i64) -> bool {
        match self.try_decay(agent_id, days_threshold).await {
            Ok(affected) => {
                debug!(%agent_id, affected, days_threshold, "Decay pass complete");
                true
            }
            Err(e) => {
                warn!(%agent_id, error = %e, "Memory decay failed");
                false
            }
        }
    }

    async fn cleanup(&self, agent_id: Uuid) -> u64 {
        match self.try_cleanup(agent_id).await {
            Ok(removed) => {
                if removed > 0 {
                    info!(%agent_id, removed, "Removed fully decayed memories");
                }
                removed
            }
            Err(e) => {
                warn!(%agent_id, error = %e, "Memory cleanup failed");
                0
            }
        }
    }

    async fn list(
        &self,
        agent_id: Uuid,
        filter: MemoryFilter,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut conditions = vec!["agent_id = ?1".to_string()];
        let mut next_param = 2;

        if filter.kind.is_some() {
            conditions.push(format!("kind = ?{next_param}"));
            next_param += 1;
        }
        if filter.search.is_some() {
            conditions.push(format!("content LIKE ?{next_param} ESCAPE '\\'"));
            next_param += 1;
        }

        let sql = format!(
            "SELECT * FROM agent_memories WHERE {} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            conditions.join(" AND "),
            next_param,
            next_param + 1
        );

        let mut query = sqlx::query(&sql).bind(agent_id.to_string());
        if let Some(kind) = &filter.kind {
            query = query.bind(kind.clone());
        }
        if let Some(search) = &filter.search {
            let escaped = search.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            query = query.bind(format!("%{escaped}%"));
        }
        query = query.bind(filter.limit as i64).bind(filter.offset as i64);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("list: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, MemoryError> {
        let result = sqlx::query("DELETE FROM agent_memories WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("delete: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, agent_id: Uuid) -> Result<u64, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM agent_memories WHERE agent_id = ?1")
            .bind(agent_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("count: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| MemoryError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roost_core::memory::kind;

    async fn test_store() -> SqliteMemoryStore {
        SqliteMemoryStore::new("sqlite::memory:").await.unwrap()
    }

    fn draft(agent_id: Uuid, content: &str) -> MemoryDraft {
        MemoryDraft::new(agent_id, kind::FACT, content)
    }

    /// Rewrite timestamps so a record looks `days` old.
    async fn backdate(store: &SqliteMemoryStore, id: Uuid, days: i64) {
        let old = fmt_ts(Utc::now() - Duration::days(days));
        sqlx::query("UPDATE agent_memories SET created_at = ?1, last_accessed = ?1 WHERE id = ?2")
            .bind(&old)
            .bind(id.to_string())
            .execute(&store.pool)
            .await
            .unwrap();
    }

    async fn set_decay(store: &SqliteMemoryStore, id: Uuid, decay: Option<f64>) {
        sqlx::query("UPDATE agent_memories SET decay_factor = ?1 WHERE id = ?2")
            .bind(decay)
            .bind(id.to_string())
            .execute(&store.pool)
            .await
            .unwrap();
    }

    async fn get_decay(store: &SqliteMemoryStore, id: Uuid) -> Option<f64> {
        sqlx::query("SELECT decay_factor FROM agent_memories WHERE id = ?1")
            .bind(id.to_string())
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .try_get("decay_factor")
            .unwrap()
    }

    #[tokio::test]
    async fn save_then_recall_surfaces_fresh_record() {
        let store = test_store().await;
        let agent = Uuid::new_v4();

        let id = store.save(draft(agent, "The deploy runs at 02:00 UTC")).await.unwrap();
        let results = store.recall(agent, "", 5).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].decay_factor, Some(1.0));
        assert!(results[0].last_accessed.is_some());
    }

    #[tokio::test]
    async fn recall_respects_limit() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        for i in 0..8 {
            store.save(draft(agent, &format!("fact number {i}"))).await.unwrap();
        }

        let results = store.recall(agent, "", 3).await;
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn recall_orders_by_importance_then_recency() {
        let store = test_store().await;
        let agent = Uuid::new_v4();

        let older_high = store
            .save(draft(agent, "older high importance").with_importance(8))
            .await
            .unwrap();
        backdate(&store, older_high, 2).await;

        let newer_high = store
            .save(draft(agent, "newer high importance").with_importance(8))
            .await
            .unwrap();
        let low = store
            .save(draft(agent, "low importance").with_importance(2))
            .await
            .unwrap();

        let results = store.recall(agent, "", 10).await;
        let ids: Vec<Uuid> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer_high, older_high, low]);

        // Equal importance, limit 1 → the newer record wins.
        let top = store.recall(agent, "", 1).await;
        assert_eq!(top[0].id, newer_high);
    }

    #[tokio::test]
    async fn recall_excludes_decayed_records() {
        let store = test_store().await;
        let agent = Uuid::new_v4();

        let live = store.save(draft(agent, "still relevant")).await.unwrap();
        let dying = store.save(draft(agent, "nearly gone")).await.unwrap();
        set_decay(&store, dying, Some(0.05)).await;
        let unset = store.save(draft(agent, "legacy row without decay")).await.unwrap();
        set_decay(&store, unset, None).await;

        let ids: Vec<Uuid> = store.recall(agent, "", 10).await.iter().map(|r| r.id).collect();
        assert!(ids.contains(&live));
        assert!(ids.contains(&unset));
        assert!(!ids.contains(&dying));
    }

    #[tokio::test]
    async fn recall_is_scoped_to_agent() {
        let store = test_store().await;
        let agent_a = Uuid::new_v4();
        let agent_b = Uuid::new_v4();
        store.save(draft(agent_a, "belongs to a")).await.unwrap();
        store.save(draft(agent_b, "belongs to b")).await.unwrap();

        let results = store.recall(agent_a, "", 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "belongs to a");
    }

    #[tokio::test]
    async fn query_text_does_not_change_results() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        for i in 0..4 {
            store
                .save(draft(agent, &format!("note {i}")).with_importance(i + 1))
                .await
                .unwrap();
        }

        let plain: Vec<Uuid> = store.recall(agent, "", 10).await.iter().map(|r| r.id).collect();
        let queried: Vec<Uuid> = store
            .recall(agent, "completely unrelated search text", 10)
            .await
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(plain, queried);
    }

    #[tokio::test]
    async fn recall_touches_last_accessed() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        let id = store.save(draft(agent, "touch me")).await.unwrap();
        backdate(&store, id, 45).await;

        let before = store.recall(agent, "", 5).await;
        assert_eq!(before.len(), 1);

        // The batched touch ran after the read; verify against the table.
        let row = sqlx::query("SELECT last_accessed FROM agent_memories WHERE id = ?1")
            .bind(id.to_string())
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let raw: String = row.try_get("last_accessed").unwrap();
        let touched = parse_ts(&raw).unwrap();
        assert!(Utc::now() - touched < Duration::minutes(1));
    }

    #[tokio::test]
    async fn decay_only_affects_stale_records() {
        let store = test_store().await;
        let agent = Uuid::new_v4();

        let stale = store.save(draft(agent, "stale")).await.unwrap();
        backdate(&store, stale, 40).await;
        let fresh = store.save(draft(agent, "fresh")).await.unwrap();

        assert!(store.decay_old_memories(agent, 30).await);

        assert_eq!(get_decay(&store, stale).await, Some(0.9));
        assert_eq!(get_decay(&store, fresh).await, Some(1.0));
    }

    #[tokio::test]
    async fn decay_treats_unset_last_accessed_as_stale() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        let id = store.save(draft(agent, "never recalled")).await.unwrap();
        sqlx::query("UPDATE agent_memories SET last_accessed = NULL WHERE id = ?1")
            .bind(id.to_string())
            .execute(&store.pool)
            .await
            .unwrap();

        store.decay_old_memories(agent, 30).await;
        assert_eq!(get_decay(&store, id).await, Some(0.9));
    }

    #[tokio::test]
    async fn ten_decay_passes_reach_exactly_zero() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        let id = store.save(draft(agent, "fading")).await.unwrap();
        backdate(&store, id, 90).await;

        for _ in 0..10 {
            store.decay_old_memories(agent, 30).await;
            let decay = get_decay(&store, id).await.unwrap();
            assert!(decay >= 0.0, "decay must never go negative, got {decay}");
        }
        assert_eq!(get_decay(&store, id).await, Some(0.0));

        // An eleventh pass leaves the dead record untouched.
        store.decay_old_memories(agent, 30).await;
        assert_eq!(get_decay(&store, id).await, Some(0.0));
    }

    #[tokio::test]
    async fn cleanup_removes_only_dead_records() {
        let store = test_store().await;
        let agent = Uuid::new_v4();

        let dead_a = store.save(draft(agent, "dead a")).await.unwrap();
        set_decay(&store, dead_a, Some(0.0)).await;
        let dead_b = store.save(draft(agent, "dead b")).await.unwrap();
        set_decay(&store, dead_b, Some(0.0)).await;
        let dying = store.save(draft(agent, "dying")).await.unwrap();
        set_decay(&store, dying, Some(0.1)).await;
        let unset = store.save(draft(agent, "unset decay")).await.unwrap();
        set_decay(&store, unset, None).await;

        assert_eq!(store.cleanup(agent).await, 2);
        assert_eq!(store.count(agent).await.unwrap(), 2);

        let ids: Vec<Uuid> = store.recall(agent, "", 10).await.iter().map(|r| r.id).collect();
        assert!(!ids.contains(&dead_a));
        assert!(!ids.contains(&dead_b));

        // Nothing left to delete.
        assert_eq!(store.cleanup(agent).await, 0);
    }

    #[tokio::test]
    async fn importance_is_clamped_on_save() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        store.save(draft(agent, "too big").with_importance(99)).await.unwrap();

        let results = store.recall(agent, "", 1).await;
        assert_eq!(results[0].importance, 10);
    }

    #[tokio::test]
    async fn metadata_round_trip() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        store
            .save(
                draft(agent, "with extras")
                    .with_metadata(serde_json::json!({ "source": "chat", "turn": 7 })),
            )
            .await
            .unwrap();

        let results = store.recall(agent, "", 1).await;
        assert_eq!(results[0].metadata["source"], "chat");
        assert_eq!(results[0].metadata["turn"], 7);
    }

    #[tokio::test]
    async fn list_filters_by_kind_and_search() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        store.save(draft(agent, "likes black coffee")).await.unwrap();
        store
            .save(MemoryDraft::new(agent, kind::DECISION, "ship on friday"))
            .await
            .unwrap();
        store
            .save(MemoryDraft::new(agent, kind::DECISION, "skip the standup"))
            .await
            .unwrap();

        let decisions = store
            .list(
                agent,
                MemoryFilter {
                    kind: Some(kind::DECISION.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(decisions.len(), 2);

        let coffee = store
            .list(
                agent,
                MemoryFilter {
                    search: Some("COFFEE".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(coffee.len(), 1);
        assert!(coffee[0].content.contains("coffee"));
    }

    #[tokio::test]
    async fn list_honors_limit_and_offset() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        for i in 0..5 {
            let id = store.save(draft(agent, &format!("entry {i}"))).await.unwrap();
            backdate(&store, id, 5 - i).await; // entry 4 newest
        }

        let page = store
            .list(
                agent,
                MemoryFilter {
                    limit: 2,
                    offset: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].content, "entry 3");
        assert_eq!(page[1].content, "entry 2");
    }

    #[tokio::test]
    async fn delete_by_id() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        let id = store.save(draft(agent, "short-lived")).await.unwrap();

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert_eq!(store.count(agent).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn operations_degrade_on_closed_pool() {
        let store = test_store().await;
        let agent = Uuid::new_v4();
        store.save(draft(agent, "about to lose the database")).await.unwrap();
        store.pool.close().await;

        assert!(store.recall(agent, "", 5).await.is_empty());
        assert!(store.save(draft(agent, "won't persist")).await.is_none());
        assert!(!store.decay_old_memories(agent, 30).await);
        assert_eq!(store.cleanup(agent).await, 0);
        assert!(store.list(agent, MemoryFilter::default()).await.is_err());
    }

    #[tokio::test]
    async fn import_legacy_rows_unpacks_decay_state() {
        let store = test_store().await;
        let agent = Uuid::new_v4();

        let row = LegacyMemoryRow {
            id: Uuid::new_v4(),
            agent_id: agent,
            kind: kind::FACT.into(),
            content: "from the old layout".into(),
            metadata: serde_json::json!({
                "importance": 8,
                "decay_factor": 0.6,
                "last_accessed": "2024-11-02T10:00:00Z",
                "origin": "migration"
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            workspace_id: Uuid::nil(),
        };

        assert_eq!(store.import_legacy(vec![row]).await.unwrap(), 1);

        let results = store.recall(agent, "", 5).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].importance, 8);
        assert_eq!(results[0].decay_factor, Some(0.6));
        // Packed keys are stripped; extras survive.
        assert!(results[0].metadata.get("decay_factor").is_none());
        assert_eq!(results[0].metadata["origin"], "migration");
    }

    #[tokio::test]
    async fn store_name() {
        let store = test_store().await;
        assert_eq!(store.name(), "sqlite");
    }
}
