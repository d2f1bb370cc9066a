//! Roost CLI — the main entry point.
//!
//! Commands:
//! - `memory`  — Store, recall, decay, clean up, list, and delete memories
//! - `agent`   — Seed and inspect agent profiles and tasks
//! - `prompt`  — Assemble and print an agent's system prompt
//! - `status`  — Show configuration and store status
//!
//! The `memory decay` and `memory cleanup` commands are the external
//! periodic trigger for the memory lifecycle — wire them to cron or a
//! scheduler of your choice.

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;
mod store;

#[derive(Parser)]
#[command(
    name = "roost",
    about = "Roost — agent memory and turn routing for multi-agent workspaces",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage agent memories
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Seed and inspect agent profiles and tasks
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },

    /// Assemble and print an agent's system prompt
    Prompt {
        /// Agent ID
        agent: Uuid,

        /// User message forwarded to memory recall
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Show configuration and store status
    Status,
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Store a new memory
    Save {
        agent: Uuid,
        content: String,

        /// Memory kind (fact, conversation, decision, observation, ...)
        #[arg(long, default_value = "fact")]
        kind: String,

        /// Importance 1-10
        #[arg(long, default_value_t = 5)]
        importance: i32,
    },

    /// Ranked recall of live memories (touches last-accessed)
    Recall {
        agent: Uuid,

        #[arg(short, long, default_value = "")]
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Run one decay pass over stale memories
    Decay {
        agent: Uuid,

        /// Staleness threshold in days (defaults to the configured value)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Hard-delete fully decayed memories
    Cleanup { agent: Uuid },

    /// List memories newest-first
    List {
        agent: Uuid,

        #[arg(long)]
        kind: Option<String>,

        /// Content substring filter
        #[arg(long)]
        search: Option<String>,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Delete a single memory by id
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Create or update an agent profile
    Set {
        agent: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        personality: Option<String>,

        #[arg(long)]
        soul: Option<String>,

        /// Comma-separated capability list
        #[arg(long, value_delimiter = ',')]
        capabilities: Vec<String>,

        #[arg(long)]
        prompt_template: Option<String>,

        /// Force-enable the tool-augmented runtime
        #[arg(long)]
        enable_tools: bool,
    },

    /// Show an agent profile
    Show { agent: Uuid },

    /// Assign a task to an agent
    Task {
        agent: Uuid,
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// low, medium, or high
        #[arg(long, default_value = "medium")]
        priority: String,

        /// Due date (RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Memory { command } => match command {
            MemoryCommands::Save {
                agent,
                content,
                kind,
                importance,
            } => commands::memory::save(agent, &kind, &content, importance).await?,
            MemoryCommands::Recall { agent, query, limit } => {
                commands::memory::recall(agent, &query, limit).await?
            }
            MemoryCommands::Decay { agent, days } => commands::memory::decay(agent, days).await?,
            MemoryCommands::Cleanup { agent } => commands::memory::cleanup(agent).await?,
            MemoryCommands::List {
                agent,
                kind,
                search,
                limit,
                offset,
            } => commands::memory::list(agent, kind, search, limit, offset).await?,
            MemoryCommands::Delete { id } => commands::memory::delete(id).await?,
        },
        Commands::Agent { command } => match command {
            AgentCommands::Set {
                agent,
                name,
                role,
                personality,
                soul,
                capabilities,
                prompt_template,
                enable_tools,
            } => {
                commands::agent::set(
                    agent,
                    name,
                    role,
                    personality,
                    soul,
                    capabilities,
                    prompt_template,
                    enable_tools,
                )
                .await?
            }
            AgentCommands::Show { agent } => commands::agent::show(agent).await?,
            AgentCommands::Task {
                agent,
                title,
                description,
                priority,
                due,
            } => commands::agent::task(agent, &title, description, &priority, due).await?,
        },
        Commands::Prompt { agent, message } => commands::prompt::run(agent, &message).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
