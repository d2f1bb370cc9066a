//! Adapter for the metadata-packed legacy row layout.
//!
//! An earlier schema stored `importance`, `decay_factor`, and
//! `last_accessed` inside the `metadata` JSON column instead of as real
//! columns. The canonical layout uses explicit columns; this module is the
//! explicit read/write adapter for historical data. Conversion is a
//! deliberate migration step (see [`crate::sqlite::SqliteMemoryStore::import_legacy`]),
//! never a silent dual-read.

use chrono::{DateTime, Utc};
use roost_core::memory::{DEFAULT_IMPORTANCE, MemoryRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PACKED_IMPORTANCE: &str = "importance";
const PACKED_DECAY: &str = "decay_factor";
const PACKED_LAST_ACCESSED: &str = "last_accessed";

/// A memory row in the legacy layout: decay state packed into metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyMemoryRow {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub kind: String,
    pub content: String,

    /// Packed fields plus caller-supplied extras.
    pub metadata: serde_json::Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub workspace_id: Uuid,
}

impl LegacyMemoryRow {
    /// Convert to the canonical record shape.
    ///
    /// Packed keys are lifted into real fields and removed from the
    /// metadata blob; absent keys take the documented defaults
    /// (importance 5, decay and last-accessed unset).
    pub fn unpack(self) -> MemoryRecord {
        let mut metadata = match self.metadata {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        let importance = metadata
            .remove(PACKED_IMPORTANCE)
            .and_then(|v| v.as_i64())
            .map(|v| (v as i32).clamp(1, 10))
            .unwrap_or(DEFAULT_IMPORTANCE);

        let decay_factor = metadata.remove(PACKED_DECAY).and_then(|v| v.as_f64());

        let last_accessed = metadata
            .remove(PACKED_LAST_ACCESSED)
            .and_then(|v| v.as_str().map(str::to_owned))
            .and_then(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            });

        MemoryRecord {
            id: self.id,
            agent_id: self.agent_id,
            kind: self.kind,
            content: self.content,
            importance,
            decay_factor,
            last_accessed,
            metadata: serde_json::Value::Object(metadata),
            created_at: self.created_at,
            updated_at: self.updated_at,
            workspace_id: self.workspace_id,
        }
    }
}

impl From<MemoryRecord> for LegacyMemoryRow {
    /// Pack a canonical record back into the legacy layout (used when
    /// writing through to a store that still speaks the old schema).
    fn from(record: MemoryRecord) -> Self {
        let mut metadata = match record.metadata {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        metadata.insert(PACKED_IMPORTANCE.into(), record.importance.into());
        if let Some(decay) = record.decay_factor {
            metadata.insert(PACKED_DECAY.into(), serde_json::json!(decay));
        }
        if let Some(last_accessed) = record.last_accessed {
            metadata.insert(
                PACKED_LAST_ACCESSED.into(),
                serde_json::json!(last_accessed.to_rfc3339()),
            );
        }

        Self {
            id: record.id,
            agent_id: record.agent_id,
            kind: record.kind,
            content: record.content,
            metadata: serde_json::Value::Object(metadata),
            created_at: record.created_at,
            updated_at: record.updated_at,
            workspace_id: record.workspace_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roost_core::memory::kind;

    fn legacy_row(metadata: serde_json::Value) -> LegacyMemoryRow {
        LegacyMemoryRow {
            id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            kind: kind::FACT.into(),
            content: "stored under the old layout".into(),
            metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            workspace_id: Uuid::nil(),
        }
    }

    #[test]
    fn unpack_lifts_packed_fields() {
        let record = legacy_row(serde_json::json!({
            "importance": 7,
            "decay_factor": 0.4,
            "last_accessed": "2024-10-01T08:30:00Z",
            "channel": "email"
        }))
        .unpack();

        assert_eq!(record.importance, 7);
        assert_eq!(record.decay_factor, Some(0.4));
        assert_eq!(
            record.last_accessed.unwrap().to_rfc3339(),
            "2024-10-01T08:30:00+00:00"
        );
        // Packed keys removed, extras kept.
        let metadata = record.metadata.as_object().unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["channel"], "email");
    }

    #[test]
    fn unpack_defaults_absent_fields() {
        let record = legacy_row(serde_json::json!({})).unpack();
        assert_eq!(record.importance, 5);
        assert_eq!(record.decay_factor, None);
        assert_eq!(record.last_accessed, None);
    }

    #[test]
    fn unpack_clamps_out_of_range_importance() {
        let record = legacy_row(serde_json::json!({ "importance": 40 })).unpack();
        assert_eq!(record.importance, 10);
    }

    #[test]
    fn unpack_tolerates_non_object_metadata() {
        let record = legacy_row(serde_json::json!("not an object")).unpack();
        assert_eq!(record.importance, 5);
        assert!(record.metadata.as_object().unwrap().is_empty());
    }

    #[test]
    fn pack_unpack_round_trip() {
        let original = legacy_row(serde_json::json!({
            "importance": 3,
            "decay_factor": 0.9,
            "last_accessed": "2025-01-15T12:00:00Z",
            "note": "keep me"
        }));
        let id = original.id;

        let repacked: LegacyMemoryRow = original.unpack().into();
        assert_eq!(repacked.id, id);
        assert_eq!(repacked.metadata["importance"], 3);
        assert_eq!(repacked.metadata["decay_factor"], 0.9);
        assert_eq!(repacked.metadata["note"], "keep me");

        let record = repacked.unpack();
        assert_eq!(record.importance, 3);
        assert_eq!(record.decay_factor, Some(0.9));
    }
}
