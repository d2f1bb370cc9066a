//! System prompt assembly.
//!
//! Builds the model-facing system prompt from three independently fetched
//! inputs: the agent's profile, its recalled memories, and its open tasks.
//! The section order below is the model-facing contract and must stay
//! stable:
//!
//! 1. Identity header (name, role, optional personality)
//! 2. Current timestamp + workspace line
//! 3. Core identity (SOUL) block
//! 4. Capabilities
//! 5. Recent memories
//! 6. Current tasks
//! 7. Custom instruction template
//! 8. Fixed tool-usage policy block
//!
//! Sections with no data are omitted entirely. `build` never fails: each
//! fetch degrades in isolation, and if the profile itself cannot be
//! resolved the caller gets the minimal fallback prompt.

use chrono::{DateTime, Utc};
use roost_core::memory::{DEFAULT_WORKSPACE, MemoryRecord, MemoryStore};
use roost_core::profile::{AgentProfile, ProfileSource};
use roost_core::task::{TaskRef, TaskSource};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Memories recalled into the prompt per turn.
pub const DEFAULT_RECALL_LIMIT: usize = 5;

/// Open tasks surfaced in the prompt per turn.
pub const DEFAULT_TASK_LIMIT: usize = 10;

/// Assembles the per-turn system prompt. Stateless — create one and reuse.
pub struct PromptAssembler {
    profiles: Arc<dyn ProfileSource>,
    memory: Arc<dyn MemoryStore>,
    tasks: Arc<dyn TaskSource>,
    recall_limit: usize,
    task_limit: usize,
}

impl PromptAssembler {
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        memory: Arc<dyn MemoryStore>,
        tasks: Arc<dyn TaskSource>,
    ) -> Self {
        Self {
            profiles,
            memory,
            tasks,
            recall_limit: DEFAULT_RECALL_LIMIT,
            task_limit: DEFAULT_TASK_LIMIT,
        }
    }

    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    pub fn with_task_limit(mut self, limit: usize) -> Self {
        self.task_limit = limit;
        self
    }

    /// Build the system prompt for `agent_id`. Never fails.
    ///
    /// `user_message` is forwarded to memory recall as the ranking query.
    pub async fn build(&self, agent_id: Uuid, user_message: &str) -> String {
        // The three fetches are independent; run them concurrently and let
        // each one degrade on its own.
        let (profile, memories, tasks) = tokio::join!(
            self.fetch_profile(agent_id),
            self.memory.recall(agent_id, user_message, self.recall_limit),
            self.fetch_tasks(agent_id),
        );

        match profile {
            Some(profile) => {
                debug!(
                    %agent_id,
                    memories = memories.len(),
                    tasks = tasks.len(),
                    "Assembled system prompt"
                );
                render_prompt(&profile, &memories, &tasks, Utc::now())
            }
            None => {
                warn!(%agent_id, "Profile unavailable, using minimal prompt");
                minimal_prompt(Utc::now())
            }
        }
    }

    async fn fetch_profile(&self, agent_id: Uuid) -> Option<AgentProfile> {
        match self.profiles.profile(agent_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(%agent_id, error = %e, "Profile fetch failed");
                None
            }
        }
    }

    async fn fetch_tasks(&self, agent_id: Uuid) -> Vec<TaskRef> {
        match self.tasks.open_tasks(agent_id, self.task_limit).await {
            Ok(mut tasks) => {
                tasks.truncate(self.task_limit);
                tasks
            }
            Err(e) => {
                warn!(%agent_id, error = %e, "Task fetch failed");
                Vec::new()
            }
        }
    }
}

/// Render the full prompt from already-fetched inputs. Deterministic for
/// a fixed `now`.
pub fn render_prompt(
    profile: &AgentProfile,
    memories: &[MemoryRecord],
    tasks: &[TaskRef],
    now: DateTime<Utc>,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push("# Agent Identity".into());
    parts.push(format!("Name: {}", profile.display_name()));
    parts.push(format!("Role: {}", profile.display_role()));
    if let Some(personality) = &profile.personality {
        parts.push(format!("Personality: {personality}"));
    }

    parts.push(format!("\nCurrent DateTime: {}", now.to_rfc3339()));
    parts.push(format!("Workspace ID: {DEFAULT_WORKSPACE}"));

    if let Some(soul) = &profile.soul {
        parts.push("\n# Core Identity (SOUL)".into());
        parts.push(soul.clone());
    }

    if !profile.capabilities.is_empty() {
        parts.push("\n# Capabilities".into());
        parts.push(profile.capabilities.join(", "));
    }

    if !memories.is_empty() {
        parts.push("\n# Recent Memories".into());
        for (idx, memory) in memories.iter().enumerate() {
            parts.push(format!("[{}] {}: {}", idx + 1, memory.kind, memory.content));
        }
    }

    if !tasks.is_empty() {
        parts.push("\n# Your Current Tasks".into());
        for (idx, task) in tasks.iter().enumerate() {
            let due = task
                .due_date
                .map(|d| format!(" (due: {})", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            parts.push(format!(
                "[{}] {}{} - {} [{}]",
                idx + 1,
                task.title,
                due,
                task.status.as_str(),
                task.priority.as_str()
            ));
            if let Some(description) = &task.description {
                parts.push(format!("    {description}"));
            }
        }
    }

    if let Some(template) = &profile.prompt_template {
        parts.push("\n# Instructions".into());
        parts.push(template.clone());
    }

    parts.push("\n# Tool Usage".into());
    parts.push("You have access to various tools. Use them proactively to accomplish tasks.".into());
    parts.push("Always think step-by-step and use the appropriate tool for each action.".into());
    parts.push("If a tool fails, try an alternative approach or inform the user gracefully.".into());

    parts.join("\n")
}

/// The last-resort prompt when identity resolution fails entirely.
pub fn minimal_prompt(now: DateTime<Utc>) -> String {
    format!("You are an AI agent assistant. Current time: {}", now.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roost_core::error::{ProfileError, TaskError};
    use roost_core::memory::{MemoryDraft, kind};
    use roost_core::task::{TaskPriority, TaskStatus};
    use roost_memory::InMemoryStore;

    // ── Mock collaborators ─────────────────────────────────────────────

    struct StaticProfiles {
        profile: Option<AgentProfile>,
        fail: bool,
    }

    #[async_trait]
    impl ProfileSource for StaticProfiles {
        async fn profile(&self, _agent_id: Uuid) -> Result<Option<AgentProfile>, ProfileError> {
            if self.fail {
                return Err(ProfileError::Lookup("connection refused".into()));
            }
            Ok(self.profile.clone())
        }
    }

    struct StaticTasks {
        tasks: Vec<TaskRef>,
        fail: bool,
    }

    #[async_trait]
    impl TaskSource for StaticTasks {
        async fn open_tasks(&self, _agent_id: Uuid, limit: usize) -> Result<Vec<TaskRef>, TaskError> {
            if self.fail {
                return Err(TaskError::Lookup("relation does not exist".into()));
            }
            Ok(self.tasks.iter().take(limit).cloned().collect())
        }
    }

    fn full_profile(agent_id: Uuid) -> AgentProfile {
        AgentProfile {
            agent_id,
            name: Some("Marcel".into()),
            role: Some("Operations butler".into()),
            personality: Some("ISTJ".into()),
            soul: Some("Calm, precise, discreet.".into()),
            capabilities: vec!["email".into(), "calendar".into()],
            prompt_template: Some("Always confirm before sending email.".into()),
            metadata: serde_json::json!({}),
        }
    }

    fn assembler(
        profile: Option<AgentProfile>,
        profile_fail: bool,
        memory: Arc<InMemoryStore>,
        tasks: Vec<TaskRef>,
        tasks_fail: bool,
    ) -> PromptAssembler {
        PromptAssembler::new(
            Arc::new(StaticProfiles {
                profile,
                fail: profile_fail,
            }),
            memory,
            Arc::new(StaticTasks {
                tasks,
                fail: tasks_fail,
            }),
        )
    }

    fn sample_task(due: bool, description: Option<&str>) -> TaskRef {
        TaskRef {
            id: Uuid::new_v4(),
            title: "Prepare weekly report".into(),
            description: description.map(String::from),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            assignee: None,
            due_date: due.then(|| "2026-08-14T00:00:00Z".parse().unwrap()),
        }
    }

    // ── Tests ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn full_prompt_has_sections_in_order() {
        let agent = Uuid::new_v4();
        let memory = Arc::new(InMemoryStore::new());
        memory
            .save(MemoryDraft::new(agent, kind::FACT, "Prefers short replies"))
            .await
            .unwrap();

        let asm = assembler(
            Some(full_profile(agent)),
            false,
            memory,
            vec![sample_task(true, Some("Cover sales and support"))],
            false,
        );
        let prompt = asm.build(agent, "hello").await;

        let order = [
            "# Agent Identity",
            "Current DateTime:",
            "# Core Identity (SOUL)",
            "# Capabilities",
            "# Recent Memories",
            "# Your Current Tasks",
            "# Instructions",
            "# Tool Usage",
        ];
        let mut last = 0;
        for marker in order {
            let pos = prompt
                .find(marker)
                .unwrap_or_else(|| panic!("missing section: {marker}"));
            assert!(pos >= last, "section {marker} out of order");
            last = pos;
        }
    }

    #[tokio::test]
    async fn identity_lines_rendered() {
        let agent = Uuid::new_v4();
        let asm = assembler(
            Some(full_profile(agent)),
            false,
            Arc::new(InMemoryStore::new()),
            vec![],
            false,
        );
        let prompt = asm.build(agent, "").await;

        assert!(prompt.contains("Name: Marcel"));
        assert!(prompt.contains("Role: Operations butler"));
        assert!(prompt.contains("Personality: ISTJ"));
        assert!(prompt.contains("Workspace ID: 00000000-0000-0000-0000-000000000000"));
        assert!(prompt.contains("email, calendar"));
    }

    #[tokio::test]
    async fn memory_lines_are_numbered_with_kind() {
        let agent = Uuid::new_v4();
        let memory = Arc::new(InMemoryStore::new());
        memory
            .save(MemoryDraft::new(agent, kind::FACT, "Owner is in UTC+2").with_importance(9))
            .await
            .unwrap();
        memory
            .save(MemoryDraft::new(agent, kind::DECISION, "Weekly sync moved to Monday"))
            .await
            .unwrap();

        let asm = assembler(Some(full_profile(agent)), false, memory, vec![], false);
        let prompt = asm.build(agent, "").await;

        assert!(prompt.contains("[1] fact: Owner is in UTC+2"));
        assert!(prompt.contains("[2] decision: Weekly sync moved to Monday"));
    }

    #[tokio::test]
    async fn task_lines_with_due_date_and_description() {
        let agent = Uuid::new_v4();
        let asm = assembler(
            Some(full_profile(agent)),
            false,
            Arc::new(InMemoryStore::new()),
            vec![sample_task(true, Some("Cover sales and support"))],
            false,
        );
        let prompt = asm.build(agent, "").await;

        assert!(prompt.contains("[1] Prepare weekly report (due: 2026-08-14) - in_progress [high]"));
        assert!(prompt.contains("    Cover sales and support"));
    }

    #[tokio::test]
    async fn undated_task_omits_due_clause() {
        let agent = Uuid::new_v4();
        let asm = assembler(
            Some(full_profile(agent)),
            false,
            Arc::new(InMemoryStore::new()),
            vec![sample_task(false, None)],
            false,
        );
        let prompt = asm.build(agent, "").await;

        assert!(prompt.contains("[1] Prepare weekly report - in_progress [high]"));
        assert!(!prompt.contains("(due:"));
    }

    #[tokio::test]
    async fn empty_sections_are_omitted() {
        let agent = Uuid::new_v4();
        let mut profile = AgentProfile::new(agent);
        profile.name = Some("Spare".into());

        let asm = assembler(Some(profile), false, Arc::new(InMemoryStore::new()), vec![], false);
        let prompt = asm.build(agent, "").await;

        assert!(!prompt.contains("# Core Identity"));
        assert!(!prompt.contains("# Capabilities"));
        assert!(!prompt.contains("# Recent Memories"));
        assert!(!prompt.contains("# Your Current Tasks"));
        assert!(!prompt.contains("# Instructions"));
        assert!(!prompt.contains("Personality:"));
        // Closing policy block is always present.
        assert!(prompt.contains("# Tool Usage"));
    }

    #[tokio::test]
    async fn unknown_agent_gets_minimal_prompt() {
        let agent = Uuid::new_v4();
        let asm = assembler(None, false, Arc::new(InMemoryStore::new()), vec![], false);
        let prompt = asm.build(agent, "").await;

        assert!(prompt.starts_with("You are an AI agent assistant."));
        assert!(prompt.contains("Current time:"));
    }

    #[tokio::test]
    async fn profile_error_gets_minimal_prompt() {
        let agent = Uuid::new_v4();
        let asm = assembler(None, true, Arc::new(InMemoryStore::new()), vec![], false);
        let prompt = asm.build(agent, "").await;

        assert!(prompt.starts_with("You are an AI agent assistant."));
    }

    #[tokio::test]
    async fn task_failure_degrades_to_no_task_section() {
        let agent = Uuid::new_v4();
        let memory = Arc::new(InMemoryStore::new());
        memory
            .save(MemoryDraft::new(agent, kind::FACT, "still remembered"))
            .await
            .unwrap();

        let asm = assembler(Some(full_profile(agent)), false, memory, vec![], true);
        let prompt = asm.build(agent, "").await;

        // Task source failed, everything else still assembles.
        assert!(!prompt.contains("# Your Current Tasks"));
        assert!(prompt.contains("still remembered"));
        assert!(prompt.contains("Name: Marcel"));
    }

    #[tokio::test]
    async fn every_failure_combination_yields_non_empty_prompt() {
        let agent = Uuid::new_v4();
        for (profile_fail, tasks_fail) in [(false, true), (true, false), (true, true)] {
            let profile = (!profile_fail).then(|| full_profile(agent));
            let asm = assembler(
                profile,
                profile_fail,
                Arc::new(InMemoryStore::new()),
                vec![],
                tasks_fail,
            );
            let prompt = asm.build(agent, "").await;
            assert!(!prompt.is_empty());
        }
    }

    #[tokio::test]
    async fn task_limit_enforced() {
        let agent = Uuid::new_v4();
        let tasks: Vec<TaskRef> = (0..15).map(|_| sample_task(false, None)).collect();
        let asm = assembler(
            Some(full_profile(agent)),
            false,
            Arc::new(InMemoryStore::new()),
            tasks,
            false,
        );
        let prompt = asm.build(agent, "").await;

        assert!(prompt.contains("[10] "));
        assert!(!prompt.contains("[11] "));
    }

    #[test]
    fn render_is_deterministic_for_fixed_inputs() {
        let agent = Uuid::new_v4();
        let profile = full_profile(agent);
        let now: DateTime<Utc> = "2026-08-07T09:00:00Z".parse().unwrap();
        let tasks = vec![sample_task(true, Some("desc"))];

        let a = render_prompt(&profile, &[], &tasks, now);
        let b = render_prompt(&profile, &[], &tasks, now);
        assert_eq!(a, b);
    }

    #[test]
    fn minimal_prompt_contains_timestamp() {
        let now: DateTime<Utc> = "2026-08-07T09:00:00Z".parse().unwrap();
        let prompt = minimal_prompt(now);
        assert!(prompt.contains("2026-08-07T09:00:00"));
    }
}
