//! In-memory store — useful for testing and ephemeral sessions.
//!
//! Implements the same recall/save/decay/cleanup semantics as the SQL
//! stores over a `Vec` behind an async `RwLock`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use roost_core::error::MemoryError;
use roost_core::memory::{
    DECAY_STEP, MemoryDraft, MemoryFilter, MemoryRanker, MemoryRecord, MemoryStore,
    RECALL_DECAY_FLOOR, RecencyRanker,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryStore {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
    ranker: Arc<dyn MemoryRanker>,
}

/// One decay step on the one-decimal lattice (1.0 → 0.9 → … → 0.0).
fn decayed(current: Option<f64>) -> f64 {
    let next = (current.unwrap_or(1.0) - DECAY_STEP).max(0.0);
    (next * 10.0).round() / 10.0
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            ranker: Arc::new(RecencyRanker),
        }
    }

    pub fn with_ranker(mut self, ranker: Arc<dyn MemoryRanker>) -> Self {
        self.ranker = ranker;
        self
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn recall(&self, agent_id: Uuid, query: &str, limit: usize) -> Vec<MemoryRecord> {
        let now = Utc::now();
        let mut records = self.records.write().await;

        let mut hits: Vec<MemoryRecord> = records
            .iter()
            .filter(|r| r.agent_id == agent_id)
            .filter(|r| r.decay_factor.is_none_or(|d| d > RECALL_DECAY_FLOOR))
            .cloned()
            .collect();

        hits.sort_by(|a, b| {
            b.importance
                .cmp(&a.importance)
                .then(b.created_at.cmp(&a.created_at))
        });
        hits.truncate(limit);
        self.ranker.rerank(query, &mut hits);

        // Touch side effect, mirrored into the returned copies.
        for hit in &mut hits {
            hit.last_accessed = Some(now);
            if let Some(stored) = records.iter_mut().find(|r| r.id == hit.id) {
                stored.last_accessed = Some(now);
                stored.updated_at = now;
            }
        }

        hits
    }

    async fn save(&self, draft: MemoryDraft) -> Option<Uuid> {
        let now = Utc::now();
        let record = MemoryRecord {
            id: Uuid::new_v4(),
            agent_id: draft.agent_id,
            kind: draft.kind.clone(),
            content: draft.content.clone(),
            importance: draft.clamped_importance(),
            decay_factor: Some(1.0),
            last_accessed: Some(now),
            metadata: draft.metadata.clone(),
            created_at: now,
            updated_at: now,
            workspace_id: draft.workspace_id,
        };
        let id = record.id;
        self.records.write().await.push(record);
        Some(id)
    }

    async fn decay_old_memories(&self, agent_id: Uuid, days_threshold: i64) -> bool {
        let cutoff = Utc::now() - Duration::days(days_threshold);
        let now = Utc::now();
        let mut records = self.records.write().await;

        for record in records.iter_mut().filter(|r| {
            r.agent_id == agent_id
                && r.last_accessed.is_none_or(|t| t < cutoff)
                && r.decay_factor.unwrap_or(1.0) > 0.0
        }) {
            record.decay_factor = Some(decayed(record.decay_factor));
            record.updated_at = now;
        }
        true
    }

    async fn cleanup(&self, agent_id: Uuid) -> u64 {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.agent_id != agent_id || !r.is_dead());
        (before - records.len()) as u64
    }

    async fn list(
        &self,
        agent_id: Uuid,
        filter: MemoryFilter,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let records = self.records.read().await;
        let search = filter.search.as_deref().map(str::to_lowercase);

        let mut hits: Vec<MemoryRecord> = records
            .iter()
            .filter(|r| r.agent_id == agent_id)
            .filter(|r| filter.kind.as_deref().is_none_or(|k| r.kind == k))
            .filter(|r| {
                search
                    .as_deref()
                    .is_none_or(|s| r.content.to_lowercase().contains(s))
            })
            .cloned()
            .collect();

        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(hits.into_iter().skip(filter.offset).take(filter.limit).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, MemoryError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn count(&self, agent_id: Uuid) -> Result<u64, MemoryError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| r.agent_id == agent_id).count() as u64)
    }
}
