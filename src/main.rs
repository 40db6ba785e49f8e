use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use swarmwatch::PanelKind;
use swarmwatch::config::{CONFIG_FILE_NAME, Config};

mod commands;

#[derive(Parser)]
#[command(name = "swarmwatch")]
#[command(about = "Polling status panels for agent swarms and background tasks")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./swarmwatch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides config and SWARMWATCH_ENDPOINT
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Context id whose tasks are shown
    #[arg(long, global = true)]
    context: Option<String>,

    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the backend and publish the task monitor panel
    Watch {
        /// Write the panel HTML here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Render a single refresh and exit
        #[arg(long)]
        once: bool,

        /// Poll period in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Render a panel from a snapshot file
    Render {
        /// JSON snapshot with orchestration, agents, tasks and context_id
        #[arg(long)]
        snapshot: PathBuf,

        #[arg(long, value_enum, default_value_t = KindArg::Tasks)]
        kind: KindArg,
    },

    /// Cancel a background task
    Cancel {
        #[arg(long)]
        task: String,
    },

    /// Print one background task as JSON
    Show {
        #[arg(long)]
        task: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Swarm,
    Tasks,
}

impl From<KindArg> for PanelKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Swarm => PanelKind::Swarm,
            KindArg::Tasks => PanelKind::TaskMonitor,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::load_or_default(Path::new(CONFIG_FILE_NAME))
            .context("Failed to load swarmwatch.toml")?,
    };
    config.apply_env();
    if let Some(endpoint) = &cli.endpoint {
        config.remote.base_url = endpoint.clone();
    }
    if let Some(context) = &cli.context {
        config.remote.context_id = Some(context.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Watch {
            output,
            once,
            interval_ms,
        } => {
            if let Some(ms) = interval_ms {
                config.panel.refresh_interval_ms = ms;
            }
            commands::watch::run(&config, output.as_deref(), once).await
        }
        Commands::Render { snapshot, kind } => {
            commands::render::run(&snapshot, kind.into(), &config.panel).await
        }
        Commands::Cancel { task } => commands::cancel::run(&config, &task).await,
        Commands::Show { task } => commands::show::run(&config, &task).await,
    }
}
