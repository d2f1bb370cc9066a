//! `roost memory` — Memory lifecycle commands.

use crate::store::{CliResult, open_memory_store};
use roost_config::AppConfig;
use roost_core::memory::{MemoryDraft, MemoryFilter};
use uuid::Uuid;

pub async fn save(agent: Uuid, kind: &str, content: &str, importance: i32) -> CliResult<()> {
    let config = AppConfig::load()?;
    let store = open_memory_store(&config).await?;

    match store
        .save(MemoryDraft::new(agent, kind, content.trim()).with_importance(importance))
        .await
    {
        Some(id) => println!("🧠 Saved memory {id}"),
        None => println!("⚠️  Memory was not saved (see logs)"),
    }
    Ok(())
}

pub async fn recall(agent: Uuid, query: &str, limit: usize) -> CliResult<()> {
    let config = AppConfig::load()?;
    let store = open_memory_store(&config).await?;

    let records = store.recall(agent, query, limit).await;
    if records.is_empty() {
        println!("   No live memories for agent {agent}.");
        return Ok(());
    }

    println!("🧠 Recalled {} memories", records.len());
    for (i, record) in records.iter().enumerate() {
        println!(
            "  {:>2}. [{} | importance {}] {}",
            i + 1,
            record.kind,
            record.importance,
            record.content
        );
    }
    Ok(())
}

pub async fn decay(agent: Uuid, days: Option<i64>) -> CliResult<()> {
    let config = AppConfig::load()?;
    let days = days.unwrap_or(config.memory.decay_after_days);
    let store = open_memory_store(&config).await?;

    if store.decay_old_memories(agent, days).await {
        println!("⏳ Decay pass complete (threshold: {days} days)");
    } else {
        println!("⚠️  Decay pass failed (see logs)");
    }
    Ok(())
}

pub async fn cleanup(agent: Uuid) -> CliResult<()> {
    let config = AppConfig::load()?;
    let store = open_memory_store(&config).await?;

    let removed = store.cleanup(agent).await;
    println!("🗑️  Removed {removed} fully decayed memories");
    Ok(())
}

pub async fn list(
    agent: Uuid,
    kind: Option<String>,
    search: Option<String>,
    limit: usize,
    offset: usize,
) -> CliResult<()> {
    let config = AppConfig::load()?;
    let store = open_memory_store(&config).await?;

    let records = store
        .list(
            agent,
            MemoryFilter {
                kind,
                search,
                limit,
                offset,
            },
        )
        .await?;

    if records.is_empty() {
        println!("   No matching memories.");
        return Ok(());
    }

    println!("🧠 {} memories", records.len());
    for record in &records {
        let decay = record
            .decay_factor
            .map(|d| format!("{d:.1}"))
            .unwrap_or_else(|| "—".into());
        println!(
            "  {} [{} | importance {} | decay {}] {}",
            record.id, record.kind, record.importance, decay, record.content
        );
    }
    Ok(())
}

pub async fn delete(id: Uuid) -> CliResult<()> {
    let config = AppConfig::load()?;
    let store = open_memory_store(&config).await?;

    if store.delete(id).await? {
        println!("🗑️  Deleted memory {id}");
    } else {
        println!("   Memory {id} not found");
    }
    Ok(())
}
