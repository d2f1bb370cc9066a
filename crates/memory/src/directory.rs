//! SQLite-backed profile and task sources.
//!
//! In production these tables belong to the dashboard; the core only reads
//! them through [`ProfileSource`] and [`TaskSource`]. This implementation
//! backs the CLI and tests with the same query shapes, and offers upserts
//! so operators can seed agents locally.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roost_core::error::{MemoryError, ProfileError, TaskError};
use roost_core::profile::{AgentProfile, ProfileSource};
use roost_core::task::{TaskPriority, TaskRef, TaskSource, TaskStatus};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let directory = Self { pool };
        directory.run_migrations().await?;
        Ok(directory)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_profiles (
                agent_id        TEXT PRIMARY KEY,
                name            TEXT,
                role            TEXT,
                personality     TEXT,
                soul            TEXT,
                capabilities    TEXT NOT NULL DEFAULT '[]',
                prompt_template TEXT,
                metadata        TEXT NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("agent_profiles table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                description TEXT,
                status      TEXT NOT NULL DEFAULT 'todo',
                priority    TEXT NOT NULL DEFAULT 'medium',
                assignee    TEXT,
                due_date    TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("tasks table: {e}")))?;

        debug!("Directory migrations complete");
        Ok(())
    }

    /// Insert or replace an agent profile.
    pub async fn upsert_profile(&self, profile: &AgentProfile) -> Result<(), MemoryError> {
        let capabilities = serde_json::to_string(&profile.capabilities)
            .map_err(|e| MemoryError::Storage(format!("capabilities serialization: {e}")))?;
        let metadata = serde_json::to_string(&profile.metadata)
            .map_err(|e| MemoryError::Storage(format!("metadata serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO agent_profiles
                (agent_id, name, role, personality, soul, capabilities, prompt_template, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(agent_id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                personality = excluded.personality,
                soul = excluded.soul,
                capabilities = excluded.capabilities,
                prompt_template = excluded.prompt_template,
                metadata = excluded.metadata
            "#,
        )
        .bind(profile.agent_id.to_string())
        .bind(&profile.name)
        .bind(&profile.role)
        .bind(&profile.personality)
        .bind(&profile.soul)
        .bind(&capabilities)
        .bind(&profile.prompt_template)
        .bind(&metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("profile upsert: {e}")))?;

        Ok(())
    }

    /// Insert or replace a task.
    pub async fn upsert_task(&self, task: &TaskRef) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, status, priority, assignee, due_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                status = excluded.status,
                priority = excluded.priority,
                assignee = excluded.assignee,
                due_date = excluded.due_date
            "#,
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assignee.map(|a| a.to_string()))
        .bind(task.due_date.map(|d| d.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("task upsert: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ProfileSource for SqliteDirectory {
    async fn profile(&self, agent_id: Uuid) -> Result<Option<AgentProfile>, ProfileError> {
        let row = sqlx::query("SELECT * FROM agent_profiles WHERE agent_id = ?1")
            .bind(agent_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ProfileError::Lookup(format!("profile query: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let capabilities_json: String = row
            .try_get("capabilities")
            .map_err(|e| ProfileError::Lookup(format!("capabilities column: {e}")))?;
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| ProfileError::Lookup(format!("metadata column: {e}")))?;

        Ok(Some(AgentProfile {
            agent_id,
            name: row.try_get("name").ok().flatten(),
            role: row.try_get("role").ok().flatten(),
            personality: row.try_get("personality").ok().flatten(),
            soul: row.try_get("soul").ok().flatten(),
            capabilities: serde_json::from_str(&capabilities_json).unwrap_or_default(),
            prompt_template: row.try_get("prompt_template").ok().flatten(),
            metadata: serde_json::from_str(&metadata_json)
                .unwrap_or(serde_json::Value::Object(serde_json::Map::new())),
        }))
    }
}

#[async_trait]
impl TaskSource for SqliteDirectory {
    async fn open_tasks(&self, agent_id: Uuid, limit: usize) -> Result<Vec<TaskRef>, TaskError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM tasks
            WHERE assignee = ?1 AND status != 'done'
            ORDER BY
                CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END,
                due_date ASC NULLS LAST
            LIMIT ?2
            "#,
        )
        .bind(agent_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TaskError::Lookup(format!("task query: {e}")))?;

        rows.iter()
            .map(|row| {
                let id: String = row
                    .try_get("id")
                    .map_err(|e| TaskError::Lookup(format!("id column: {e}")))?;
                let status: String = row
                    .try_get("status")
                    .map_err(|e| TaskError::Lookup(format!("status column: {e}")))?;
                let priority: String = row
                    .try_get("priority")
                    .map_err(|e| TaskError::Lookup(format!("priority column: {e}")))?;
                let due_date: Option<String> = row
                    .try_get("due_date")
                    .map_err(|e| TaskError::Lookup(format!("due_date column: {e}")))?;
                let assignee: Option<String> = row
                    .try_get("assignee")
                    .map_err(|e| TaskError::Lookup(format!("assignee column: {e}")))?;

                Ok(TaskRef {
                    id: Uuid::parse_str(&id)
                        .map_err(|e| TaskError::Lookup(format!("id parse: {e}")))?,
                    title: row
                        .try_get("title")
                        .map_err(|e| TaskError::Lookup(format!("title column: {e}")))?,
                    description: row.try_get("description").ok().flatten(),
                    status: TaskStatus::parse(&status).unwrap_or(TaskStatus::Todo),
                    priority: TaskPriority::parse(&priority).unwrap_or(TaskPriority::Medium),
                    assignee: assignee.and_then(|a| Uuid::parse_str(&a).ok()),
                    due_date: due_date.and_then(|d| {
                        DateTime::parse_from_rfc3339(&d)
                            .map(|dt| dt.with_timezone(&Utc))
                            .ok()
                    }),
                })
            })
            .collect()
    }
}
