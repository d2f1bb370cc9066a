//! `roost status` — Show configuration and store status.

use crate::store::CliResult;
use roost_config::AppConfig;

pub async fn run() -> CliResult<()> {
    let config = AppConfig::load()?;

    println!("🏠 Roost Status");
    println!("===============");
    println!("  Backend:         {}", config.database.backend);
    println!("  Decay threshold: {} days", config.memory.decay_after_days);
    println!("  Recall limit:    {}", config.memory.recall_limit);
    println!("  Task limit:      {}", config.prompt.task_limit);
    if config.runtime.turn_timeout_secs == 0 {
        println!("  Turn timeout:    disabled");
    } else {
        println!("  Turn timeout:    {}s", config.runtime.turn_timeout_secs);
    }

    if config.database.backend == "sqlite" {
        let db_path = AppConfig::config_dir().join(&config.database.sqlite_file);
        if db_path.exists() {
            let meta = std::fs::metadata(&db_path)?;
            let size_kb = meta.len() as f64 / 1024.0;
            println!("  DB file:         {} ({size_kb:.1} KB)", db_path.display());
        } else {
            println!("  DB file:         (not created yet)");
        }
    }

    Ok(())
}
