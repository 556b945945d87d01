//! # unplugged
//!
//! Command line front end for Unplugged fasting sessions.
//!
//! ## Commands
//!
//! - `init`: Create a local identity
//! - `start`: Start a fast with a goal in hours
//! - `cancel`: Abandon the running fast
//! - `complete`: Finish the running fast with a reflection
//! - `status`: Show the current fast
//! - `history`: List completed fasts
//! - `watch`: Follow the running fast until it ends
//! - `content`: Print the fasting devotional
//! - `reminders`: Show or change the daily reminder
//!
//! ## Example
//!
//! ```bash
//! unplugged init
//! unplugged --store http://127.0.0.1:8080 start --goal 24
//! unplugged status
//! unplugged complete --reflection "Grateful"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fast_client::{ControllerConfig, FastingController, HttpStore, HttpStoreConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::reminders::ReminderChange;
use commands::{content, fast, history, init, reminders, status, watch};
use config::{set_dir_permissions_0700, UserConfig};

/// Command line front end for Unplugged fasting sessions.
#[derive(Parser, Debug)]
#[command(name = "unplugged")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the local identity and reminder settings
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the fast-store service
    #[arg(
        long,
        global = true,
        env = "UNPLUGGED_STORE",
        default_value = "http://127.0.0.1:8080"
    )]
    store: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a local identity
    Init,

    /// Start a fast
    Start {
        /// Goal in hours (1-72)
        #[arg(long, short)]
        goal: u32,
    },

    /// Abandon the running fast (no history is recorded)
    Cancel,

    /// Complete the running fast
    Complete {
        /// What you noticed during the fast
        #[arg(long, short, default_value = "")]
        reflection: String,
    },

    /// Show the current fast
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List completed fasts
    History,

    /// Follow the running fast until it ends (Ctrl-C to stop)
    Watch,

    /// Print the fasting devotional
    Content,

    /// Show or change the daily reminder
    Reminders {
        /// Turn the reminder on
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Turn the reminder off
        #[arg(long, conflicts_with = "enable")]
        disable: bool,

        /// Time of day, HH:MM
        #[arg(long)]
        time: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    set_dir_permissions_0700(&data_dir).await?;

    match cli.command {
        Commands::Init => {
            init::run(&data_dir).await?;
        }
        Commands::Reminders {
            enable,
            disable,
            time,
        } => {
            let enabled = match (enable, disable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            reminders::run(&data_dir, ReminderChange { enabled, time }).await?;
        }
        command => {
            let controller = connect(&data_dir, &cli.store).await?;
            let result = match command {
                Commands::Start { goal } => fast::start(&controller, goal).await,
                Commands::Cancel => fast::cancel(&controller).await,
                Commands::Complete { reflection } => fast::complete(&controller, &reflection).await,
                Commands::Status { json } => status::run(&controller, json).await,
                Commands::History => history::run(&controller).await,
                Commands::Content => content::run(&controller).await,
                Commands::Watch => watch::run(&controller, ctrl_c()).await,
                Commands::Init | Commands::Reminders { .. } => Ok(()),
            };
            controller.shutdown();
            result?;
        }
    }

    Ok(())
}

/// Build a controller talking to the store as the local identity.
async fn connect(data_dir: &Path, store_url: &str) -> Result<FastingController<HttpStore>> {
    let user = UserConfig::load(data_dir).await?;
    let store = HttpStore::new(HttpStoreConfig::new(store_url, user.user_id()?))
        .context("Failed to create store client")?;
    tracing::debug!(store = store_url, "connected");
    Ok(FastingController::new(store, ControllerConfig::default()))
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Get the default data directory for unplugged.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "unplugged", "unplugged")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
