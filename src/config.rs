/// Server configuration
///
/// Resolved once at startup from command line flags and environment
/// variables. The owner and tier stand in for the authentication layer of a
/// single-user installation: every request runs as this owner.

use std::path::PathBuf;

use crate::domain::{OwnerId, StreakPolicy, SubscriptionTier};

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// SQLite database file
    pub database: PathBuf,
    /// Owner every request is made as
    pub owner: OwnerId,
    pub tier: SubscriptionTier,
    pub policy: StreakPolicy,
}

impl ServerConfig {
    /// Configuration for the local owner on the free tier with default windows
    pub fn new(database: PathBuf) -> Self {
        Self {
            database,
            owner: OwnerId::local(),
            tier: SubscriptionTier::default(),
            policy: StreakPolicy::default(),
        }
    }

    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_tier(mut self, tier: SubscriptionTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_policy(mut self, policy: StreakPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Get the default database path with a fallback chain
///
/// Tries the home, data and config directories, then the working
/// directory, and finally the system temp directory.
pub fn default_database_path() -> std::io::Result<PathBuf> {
    let potential_paths = [
        dirs::home_dir().map(|p| p.join(".habit_tracker")),
        dirs::data_dir().map(|p| p.join("habit_tracker")),
        dirs::config_dir().map(|p| p.join("habit_tracker")),
        std::env::current_dir().ok().map(|p| p.join(".habit_tracker")),
    ];

    for dir in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(dir).is_ok() {
            let probe = dir.join(".test_write");
            if std::fs::write(&probe, "test").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return Ok(dir.join("habits.db"));
            }
        }
    }

    let temp_dir = std::env::temp_dir().join("habit_tracker");
    std::fs::create_dir_all(&temp_dir)?;
    tracing::warn!("Using temporary directory for database: {}", temp_dir.display());
    Ok(temp_dir.join("habits.db"))
}
