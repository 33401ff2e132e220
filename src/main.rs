/// Main entry point for the habit streak MCP server
///
/// This file sets up logging, parses command line arguments, and starts the MCP server.
/// The server listens for JSON-RPC requests over stdin/stdout following the MCP protocol.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use habit_streak_engine::config::default_database_path;
use habit_streak_engine::{
    HabitTrackerServer, OwnerId, ServerConfig, ServerError, StreakPolicy, SubscriptionTier,
    CURRENT_STREAK_WINDOW_DAYS, LONGEST_STREAK_WINDOW_DAYS,
};

/// Command line arguments for the habit streak MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, env = "HABIT_TRACKER_DB")]
    database: Option<PathBuf>,

    /// Owner ID (UUID) every request is made as; defaults to the local owner
    #[arg(long, env = "HABIT_TRACKER_OWNER")]
    owner: Option<String>,

    /// Subscription tier: free, premium or family
    #[arg(long, env = "HABIT_TRACKER_TIER", default_value = "free")]
    tier: String,

    /// Days the current streak looks back
    #[arg(long, default_value_t = CURRENT_STREAK_WINDOW_DAYS)]
    current_window_days: u32,

    /// Days the longest streak looks back
    #[arg(long, default_value_t = LONGEST_STREAK_WINDOW_DAYS)]
    longest_window_days: u32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, ServerError> {
        let database = match self.database {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                path
            }
            None => default_database_path()?,
        };

        let owner = match self.owner.as_deref() {
            Some(raw) => OwnerId::from_string(raw)
                .map_err(|e| ServerError::Config(format!("Invalid owner ID '{}': {}", raw, e)))?,
            None => OwnerId::local(),
        };
        let tier: SubscriptionTier = self.tier.parse()?;
        let policy = StreakPolicy::new(self.current_window_days, self.longest_window_days)?;

        Ok(ServerConfig::new(database)
            .with_owner(owner)
            .with_tier(tier)
            .with_policy(policy))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    // RUST_LOG wins over the flags when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("habit_streak_engine={}", log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // stdout carries JSON-RPC
        .init();

    info!("Starting habit streak MCP server");

    let config = args.into_config()?;
    info!("Using database at: {}", config.database.display());

    let server = HabitTrackerServer::new(config).await?;
    server.run().await?;

    info!("Habit streak MCP server shutdown complete");
    Ok(())
}
