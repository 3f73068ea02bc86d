//! Terminal client for a REST task store
//!
//! - `tasks` or `tasks tui` opens the interactive list
//! - `tasks list|add|toggle|delete` run one action and print the result
//! - `tasks config` prints the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf, sync::Arc, sync::Mutex, time::Duration};
use task_list_controller::{ConsistencyPolicy, TaskListController};
use task_store_client::{HttpTaskStore, InMemoryTaskStore, TaskId, TaskStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod ui;

use crate::config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Task collection URL, e.g. http://localhost:3000/api/tasks
    #[arg(short, long, global = true, env = "TASKS_BASE_URL")]
    base_url: Option<String>,

    /// Config file to read instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep tasks in memory instead of talking to a server
    #[arg(long, global = true)]
    offline: bool,

    /// What a failed store call does to the local list
    /// (optimistic_always or rollback_on_failure)
    #[arg(long, global = true)]
    policy: Option<ConsistencyPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive task list (default)
    Tui,
    /// Print every task
    List,
    /// Create a task
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
        #[arg(short, long)]
        image_url: String,
    },
    /// Flip a task between done and not done
    Toggle {
        /// Task id
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task id
        id: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.store.base_url = base_url.clone();
        }
        if let Some(policy) = self.policy {
            config.controller.policy = policy;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let command = cli.command.unwrap_or(Commands::Tui);
    init_tracing(&config, matches!(command, Commands::Tui))?;

    if let Commands::Config = command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let store = build_store(&config, cli.offline)?;
    let mut controller = TaskListController::new(store).with_policy(config.controller.policy);
    info!(
        config_file = ?config.source,
        base_url = %config.store.base_url,
        offline = cli.offline,
        policy = %config.controller.policy,
        "Starting task client"
    );

    match command {
        Commands::Tui => ui::run_task_ui(controller).await,
        Commands::List => commands::list(&mut controller).await,
        Commands::Add {
            title,
            description,
            image_url,
        } => commands::add(&mut controller, title, description, image_url).await,
        Commands::Toggle { id } => commands::toggle(&mut controller, TaskId::from(id)).await,
        Commands::Delete { id } => commands::delete(&mut controller, TaskId::from(id)).await,
        Commands::Config => Ok(()),
    }
}

/// Log to stderr, or to a file while the terminal UI owns the screen.
fn init_tracing(config: &Config, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));

    if to_file {
        let path = config.log_file()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    Ok(())
}

fn build_store(config: &Config, offline: bool) -> Result<Arc<dyn TaskStore>> {
    if offline {
        return Ok(Arc::new(InMemoryTaskStore::new()));
    }

    let store = HttpTaskStore::builder()
        .base_url(config.store.base_url.as_str())
        .with_timeout(Duration::from_secs(config.store.timeout_secs))
        .build()
        .context("Failed to create task store client")?;
    Ok(Arc::new(store))
}
