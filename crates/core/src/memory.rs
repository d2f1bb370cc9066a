//! Memory trait — per-agent durable context with decay-based retirement.
//!
//! Each agent accumulates memory records (facts, conversation summaries,
//! decisions, observations). Records are ranked for recall by importance
//! and recency, weaken over time through an explicit decay factor, and are
//! hard-deleted once fully decayed.
//!
//! Lifecycle: `save` → `recall` (touches `last_accessed`) → periodic
//! `decay_old_memories` → `cleanup`. Scheduling of decay/cleanup belongs to
//! an external trigger; the store itself is scheduler-agnostic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MemoryError;

/// Workspace sentinel for data created before multi-tenancy existed.
/// Records saved without an explicit workspace land here.
pub const DEFAULT_WORKSPACE: Uuid = Uuid::nil();

/// Amount removed from `decay_factor` per decay pass.
pub const DECAY_STEP: f64 = 0.1;

/// Records at or below this decay factor are invisible to `recall`.
pub const RECALL_DECAY_FLOOR: f64 = 0.1;

/// Well-known memory kinds. The kind column is an open set — callers may
/// introduce new kinds without a schema change.
pub mod kind {
    pub const FACT: &str = "fact";
    pub const CONVERSATION: &str = "conversation";
    pub const DECISION: &str = "decision";
    pub const OBSERVATION: &str = "observation";
}

/// A single durable memory record tied to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique ID, generated on insert.
    pub id: Uuid,

    /// Owning agent.
    pub agent_id: Uuid,

    /// Open-set kind (see [`kind`]).
    pub kind: String,

    /// The content of the memory.
    pub content: String,

    /// Relevance weight, 1–10.
    pub importance: i32,

    /// Remaining relevance in [0.0, 1.0]. `None` means unset (legacy data),
    /// which recall treats as live. Only `save` resets it to 1.0; only
    /// decay reduces it, floored at 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_factor: Option<f64>,

    /// Set on save and refreshed on every recall.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,

    /// Caller-supplied extras only — decay state lives in real columns.
    #[serde(default)]
    pub metadata: serde_json::Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Tenancy scope; [`DEFAULT_WORKSPACE`] for pre-multi-tenant rows.
    pub workspace_id: Uuid,
}

impl MemoryRecord {
    /// Whether recall may surface this record.
    pub fn is_live(&self) -> bool {
        self.decay_factor.is_none_or(|d| d > RECALL_DECAY_FLOOR)
    }

    /// Whether cleanup may hard-delete this record.
    pub fn is_dead(&self) -> bool {
        self.decay_factor.is_some_and(|d| d <= 0.0)
    }
}

/// Default importance assigned when the caller does not specify one.
pub const DEFAULT_IMPORTANCE: i32 = 5;

/// The insert shape accepted by [`MemoryStore::save`].
#[derive(Debug, Clone)]
pub struct MemoryDraft {
    pub agent_id: Uuid,
    pub kind: String,
    pub content: String,
    pub importance: i32,
    pub metadata: serde_json::Value,
    pub workspace_id: Uuid,
}

impl MemoryDraft {
    pub fn new(agent_id: Uuid, kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent_id,
            kind: kind.into(),
            content: content.into(),
            importance: DEFAULT_IMPORTANCE,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            workspace_id: DEFAULT_WORKSPACE,
        }
    }

    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_workspace(mut self, workspace_id: Uuid) -> Self {
        self.workspace_id = workspace_id;
        self
    }

    /// Importance clamped to the valid 1–10 range.
    pub fn clamped_importance(&self) -> i32 {
        self.importance.clamp(1, 10)
    }
}

/// Filter for the dashboard-facing `list` operation.
#[derive(Debug, Clone)]
pub struct MemoryFilter {
    /// Restrict to a single kind.
    pub kind: Option<String>,

    /// Case-insensitive content substring match.
    pub search: Option<String>,

    pub limit: usize,
    pub offset: usize,
}

impl Default for MemoryFilter {
    fn default() -> Self {
        Self {
            kind: None,
            search: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Recall ranking seam.
///
/// `recall` accepts a query string, but the shipped ranking uses only
/// importance and recency — the query is deliberately inert. This trait is
/// the drop-in point for a semantic ranker: the store fetches candidates
/// and hands them (with the query) to the ranker before truncation.
/// Swapping rankers is a configuration choice, never a silent behavior
/// change.
pub trait MemoryRanker: Send + Sync {
    fn name(&self) -> &str;

    /// Reorder `records` in place. Called after the store's own
    /// importance/recency ordering.
    fn rerank(&self, query: &str, records: &mut Vec<MemoryRecord>);
}

/// The default ranker: keeps the store's importance-desc, created-desc
/// order untouched and ignores the query entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecencyRanker;

impl MemoryRanker for RecencyRanker {
    fn name(&self) -> &str {
        "recency"
    }

    fn rerank(&self, _query: &str, _records: &mut Vec<MemoryRecord>) {}
}

/// The core MemoryStore trait.
///
/// Implementations: SQLite, PostgreSQL, in-memory (for testing).
///
/// The four lifecycle operations (`recall`, `save`, `decay_old_memories`,
/// `cleanup`) swallow persistence errors: they log and return a safe
/// default so a memory outage can never fail a conversation turn. The
/// dashboard-facing operations (`list`, `delete`, `count`) propagate
/// errors normally.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "postgres", "in_memory").
    fn name(&self) -> &str;

    /// Ranked retrieval of up to `limit` live records for `agent_id`,
    /// importance descending then created_at descending. Touches
    /// `last_accessed` on every returned record in a single batched
    /// update; a failed touch is logged, never surfaced. Returns an empty
    /// list on persistence error.
    ///
    /// `query` feeds the [`MemoryRanker`] seam and does not affect the
    /// default result set.
    async fn recall(&self, agent_id: Uuid, query: &str, limit: usize) -> Vec<MemoryRecord>;

    /// Insert a new record with `decay_factor = 1.0` and `last_accessed`
    /// set to now. Returns `None` when the record was not durably saved.
    async fn save(&self, draft: MemoryDraft) -> Option<Uuid>;

    /// Weaken every record of `agent_id` not accessed within
    /// `days_threshold` days (or never accessed) by [`DECAY_STEP`],
    /// floored at 0. Idempotent per invocation and monotone: repeated
    /// calls without intervening recall drive affected records to 0.
    /// Returns `false` on persistence error.
    async fn decay_old_memories(&self, agent_id: Uuid, days_threshold: i64) -> bool;

    /// Hard-delete fully decayed records (`decay_factor <= 0`) for
    /// `agent_id`; returns the number removed (0 on error or no-op).
    async fn cleanup(&self, agent_id: Uuid) -> u64;

    /// List records newest-first with optional kind/substring filters.
    async fn list(
        &self,
        agent_id: Uuid,
        filter: MemoryFilter,
    ) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// Delete a single record by id. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> std::result::Result<bool, MemoryError>;

    /// Total records stored for the agent, live or not.
    async fn count(&self, agent_id: Uuid) -> std::result::Result<u64, MemoryError>;
}
