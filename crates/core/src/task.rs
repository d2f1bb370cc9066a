//! Task references — the agent's assigned work, consumed read-only.
//!
//! Tasks are owned by the dashboard's task board. Prompt assembly only
//! consumes open tasks assigned to the agent, priority descending, then
//! due date ascending with undated tasks last, capped by the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Variant order matters: `Ord` is used for priority-descending sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// A read-only view of a dashboard task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: TaskStatus,
    pub priority: TaskPriority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskRef {
    pub fn is_open(&self) -> bool {
        self.status != TaskStatus::Done
    }
}

/// Order tasks the way the prompt consumes them: priority descending,
/// then due date ascending with undated tasks last.
pub fn sort_for_prompt(tasks: &mut [TaskRef]) {
    tasks.sort_by(|a, b| {
        b.priority.cmp(&a.priority).then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        })
    });
}

/// Read-only access to the agent's assigned open tasks.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Up to `limit` non-done tasks assigned to `agent_id`, already
    /// ordered per [`sort_for_prompt`].
    async fn open_tasks(
        &self,
        agent_id: Uuid,
        limit: usize,
    ) -> std::result::Result<Vec<TaskRef>, TaskError>;
}
