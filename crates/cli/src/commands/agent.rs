//! `roost agent` — Profile and task seeding commands.

use crate::store::{CliResult, open_sqlite_stack};
use chrono::{DateTime, Utc};
use roost_config::AppConfig;
use roost_core::profile::{AgentProfile, ENABLE_TOOLS_KEY, ProfileSource};
use roost_core::task::{TaskPriority, TaskRef, TaskStatus};
use uuid::Uuid;

#[allow(clippy::too_many_arguments)]
pub async fn set(
    agent: Uuid,
    name: Option<String>,
    role: Option<String>,
    personality: Option<String>,
    soul: Option<String>,
    capabilities: Vec<String>,
    prompt_template: Option<String>,
    enable_tools: bool,
) -> CliResult<()> {
    let config = AppConfig::load()?;
    let (_, directory) = open_sqlite_stack(&config).await?;

    // Start from the stored profile so partial updates don't erase fields.
    let mut profile = directory
        .profile(agent)
        .await?
        .unwrap_or_else(|| AgentProfile::new(agent));

    if name.is_some() {
        profile.name = name;
    }
    if role.is_some() {
        profile.role = role;
    }
    if personality.is_some() {
        profile.personality = personality;
    }
    if soul.is_some() {
        profile.soul = soul;
    }
    if !capabilities.is_empty() {
        profile.capabilities = capabilities;
    }
    if prompt_template.is_some() {
        profile.prompt_template = prompt_template;
    }
    if enable_tools {
        if let serde_json::Value::Object(map) = &mut profile.metadata {
            map.insert(ENABLE_TOOLS_KEY.into(), serde_json::Value::Bool(true));
        }
    }

    directory.upsert_profile(&profile).await?;
    println!("✅ Profile saved for {agent}");
    Ok(())
}

pub async fn show(agent: Uuid) -> CliResult<()> {
    let config = AppConfig::load()?;
    let (_, directory) = open_sqlite_stack(&config).await?;

    match directory.profile(agent).await? {
        Some(profile) => {
            println!("🤖 {}", profile.display_name());
            println!("  Role:         {}", profile.display_role());
            if let Some(personality) = &profile.personality {
                println!("  Personality:  {personality}");
            }
            if !profile.capabilities.is_empty() {
                println!("  Capabilities: {}", profile.capabilities.join(", "));
            }
            println!("  Tools:        {}", if profile.tools_enabled() { "enabled" } else { "disabled" });
        }
        None => println!("   No profile for agent {agent}"),
    }
    Ok(())
}

pub async fn task(
    agent: Uuid,
    title: &str,
    description: Option<String>,
    priority: &str,
    due: Option<String>,
) -> CliResult<()> {
    let config = AppConfig::load()?;
    let (_, directory) = open_sqlite_stack(&config).await?;

    let priority = TaskPriority::parse(priority)
        .ok_or_else(|| format!("invalid priority '{priority}' (expected low, medium, or high)"))?;
    let due_date: Option<DateTime<Utc>> = due
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| format!("invalid due date '{raw}': {e}"))
        })
        .transpose()?;

    let task = TaskRef {
        id: Uuid::new_v4(),
        title: title.into(),
        description,
        status: TaskStatus::Todo,
        priority,
        assignee: Some(agent),
        due_date,
    };
    directory.upsert_task(&task).await?;
    println!("📋 Task {} assigned to {agent}", task.id);
    Ok(())
}
