//! `roost prompt` — Assemble and print an agent's system prompt.

use crate::store::{CliResult, open_sqlite_stack};
use roost_agent::PromptAssembler;
use roost_config::AppConfig;
use uuid::Uuid;

pub async fn run(agent: Uuid, message: &str) -> CliResult<()> {
    let config = AppConfig::load()?;
    let (store, directory) = open_sqlite_stack(&config).await?;

    let assembler = PromptAssembler::new(directory.clone(), store, directory)
        .with_recall_limit(config.memory.recall_limit)
        .with_task_limit(config.prompt.task_limit);

    let prompt = assembler.build(agent, message).await;
    println!("{prompt}");
    Ok(())
}
