//! PostgreSQL memory store.
//!
//! Mirrors the SQLite store's canonical layout and semantics on Postgres.
//! Decay and the recall touch-update remain single UPDATE statements.
//!
//! # Feature gate
//!
//! This module is behind the `postgres` feature flag:
//!
//! ```toml
//! roost-memory = { workspace = true, features = ["postgres"] }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use roost_core::error::MemoryError;
use roost_core::memory::{
    DECAY_STEP, MemoryDraft, MemoryFilter, MemoryRanker, MemoryRecord, MemoryStore,
    RECALL_DECAY_FLOOR, RecencyRanker,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct PgMemoryStore {
    pool: PgPool,
    ranker: Arc<dyn MemoryRanker>,
}

impl PgMemoryStore {
    /// Connect and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, MemoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| MemoryError::Storage(format!("PostgreSQL connection failed: {e}")))?;

        let store = Self {
            pool,
            ranker: Arc::new(RecencyRanker),
        };
        store.run_migrations().await?;
        info!("PostgreSQL memory store initialized");
        Ok(store)
    }

    /// Create from an existing connection pool (shared with the rest of
    /// the app; this store performs no pool lifecycle management).
    pub async fn from_pool(pool: PgPool) -> Result<Self, MemoryError> {
        let store = Self {
            pool,
            ranker: Arc::new(RecencyRanker),
        };
        store.run_migrations().await?;
        Ok(store)
    }

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
                decay_factor  DOUBLE PRECISION,
                last_accessed TIMESTAMPTZ,
                metadata      TEXT NOT NULL DEFAULT '{}',
                created_at    TIMESTAMPTZ NOT NULL,
                updated_at    TIMESTAMPTZ NOT NULL,
                workspace_id  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("agent_memories table: {e}")))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_agent_memories_recall
            ON agent_memories(agent_id, importance DESC, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("recall index: {e}")))?;

        debug!("PostgreSQL memory migrations complete");
        Ok(())
    }

    fn row_to_record(row: &PgRow) -> Result<MemoryRecord, MemoryError> {
        let col = |name: &str, e: sqlx::Error| MemoryError::QueryFailed(format!("{name}: {e}"));

        let id: String = row.try_get("id").map_err(|e| col("id column", e))?;
        let agent_id: String = row
            .try_get("agent_id")
            .map_err(|e| col("agent_id column", e))?;
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| col("metadata column", e))?;
        let workspace_id: String = row
            .try_get("workspace_id")
            .map_err(|e| col("workspace_id column", e))?;

        Ok(MemoryRecord {
            id: Uuid::parse_str(&id)
                .map_err(|e| MemoryError::QueryFailed(format!("id parse: {e}")))?,
            agent_id: Uuid::parse_str(&agent_id)
                .map_err(|e| MemoryError::QueryFailed(format!("agent_id parse: {e}")))?,
            kind: row.try_get("kind").map_err(|e| col("kind column", e))?,
            content: row.try_get("content").map_err(|e| col("content column", e))?,
            importance: row
                .try_get::<i32, _>("importance")
                .map_err(|e| col("importance column", e))?,
            decay_factor: row
                .try_get("decay_factor")
                .map_err(|e| col("decay_factor column", e))?,
            last_accessed: row
                .try_get::<Option<DateTime<Utc>>, _>("last_accessed")
                .map_err(|e| col("last_accessed column", e))?,
            metadata: serde_json::from_str(&metadata_json)
                .unwrap_or(serde_json::Value::Object(serde_json::Map::new())),
            created_at: row
                .try_get("created_at")
                .map_err(|e| col("created_at column", e))?,
            updated_at: row
                .try_get("updated_at")
                .map_err(|e| col("updated_at column", e))?,
            workspace_id: Uuid::parse_str(&workspace_id).unwrap_or(Uuid::nil()),
        })
    }

    async fn try_recall(
        &self,
        agent_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM agent_memories
            WHERE agent_id = $1
              AND (decay_factor IS NULL OR decay_factor > $2)
            ORDER BY importance DESC, created_at DESC
            LIMIT $3
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

    async fn touch(&self, ids: &[Uuid]) -> Result<(), MemoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        sqlx::query(
            "UPDATE agent_memories SET last_accessed = $1, updated_at = $1 WHERE id = ANY($2)",
        )
        .bind(Utc::now())
        .bind(&id_strings)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("touch: {e}")))?;
        Ok(())
    }

    async fn try_save(&self, draft: &MemoryDraft) -> Result<Uuid, MemoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let metadata = serde_json::to_string(&draft.metadata)
            .map_err(|e| MemoryError::Storage(format!("metadata serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO agent_memories
                (id, agent_id, kind, content, importance, decay_factor,
                 last_accessed, metadata, created_at, updated_at, workspace_id)
            VALUES ($1, $2, $3, $4, $5, 1.0, $6, $7, $6, $6, $8)
            "#,
        )
        .bind(id.to_string())
        .bind(draft.agent_id.to_string())
        .bind(&draft.kind)
        .bind(&draft.content)
        .bind(draft.clamped_importance())
        .bind(now)
        .bind(&metadata)
        .bind(draft.workspace_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("save: {e}")))?;

        Ok(id)
    }

    async fn try_decay(&self, agent_id: Uuid, days_threshold: i64) -> Result<u64, MemoryError> {
        let cutoff = Utc::now() - Duration::days(days_threshold);

        let result = sqlx::query(
            r#"
            UPDATE agent_memories
            SET decay_factor = ROUND(GREATEST(COALESCE(decay_factor, 1.0) - $1, 0.0)::numeric, 1)::double precision,
                updated_at = $2
            WHERE agent_id = $3
              AND (last_accessed IS NULL OR last_accessed < $4)
              AND COALESCE(decay_factor, 1.0) > 0.0
            "#,
        )
        .bind(DECAY_STEP)
        .bind(Utc::now())
        .bind(agent_id.to_string())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("decay: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn try_cleanup(&self, agent_id: Uuid) -> Result<u64, MemoryError> {
        let result =
            sqlx::query("DELETE FROM agent_memories WHERE agent_id = $1 AND decay_factor <= 0.0")
                .bind(agent_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| MemoryError::Storage(format!("cleanup: {e}")))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MemoryStore for PgMemoryStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn recall(&self, agent_id: Uuid, query: &str, limit: usize) -> Vec<MemoryRecord> {
        let mut records = match self.try_recall(agent_id, limit).await {
            Ok(records) => records,
            Err(e) => {
                warn!(%agent_id, error = %e, "Memory recall failed, returning empty");
                return Vec::new();
            }
        };

        self.ranker.rerank(query, &mut records);

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
        let mut conditions = vec!["agent_id = $1".to_string()];
        let mut next_param = 2;

        if filter.kind.is_some() {
            conditions.push(format!("kind = ${next_param}"));
            next_param += 1;
        }
        if filter.search.is_some() {
            conditions.push(format!("content ILIKE ${next_param}"));
            next_param += 1;
        }

        let sql = format!(
            "SELECT * FROM agent_memories WHERE {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
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
        let result = sqlx::query("DELETE FROM agent_memories WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("delete: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, agent_id: Uuid) -> Result<u64, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM agent_memories WHERE agent_id = $1")
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
