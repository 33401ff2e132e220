/// Public library interface for the habit streak server
///
/// This module exports the server, its configuration and the layers below
/// it (domain, storage, command handlers, analytics) for embedding and tests.

use thiserror::Error;

pub mod analytics;
pub mod config;
pub mod context;
pub mod domain;
pub mod mcp;
pub mod storage;
pub mod tools;

// Re-export public modules and types
pub use config::ServerConfig;
pub use context::RequestContext;
pub use domain::*;
pub use storage::{HabitFilter, HabitStorage, SqliteStorage, StorageError};
pub use tools::CommandError;

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error(transparent)]
    Command(#[from] tools::CommandError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Habit streak server that implements the MCP protocol
///
/// Owns the SQLite storage and the configuration every request context is
/// built from.
pub struct HabitTrackerServer {
    storage: SqliteStorage,
    config: ServerConfig,
}

impl HabitTrackerServer {
    /// Create a server, initializing the database schema if needed
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        tracing::info!("Initializing habit streak server with database: {:?}", config.database);

        let storage = SqliteStorage::new(config.database.clone())?;

        Ok(Self { storage, config })
    }

    /// Run the MCP server, handling JSON-RPC requests over stdin/stdout
    ///
    /// Returns when stdin is closed.
    pub async fn run(self) -> Result<(), ServerError> {
        let habits = self.storage.count_habits(&self.config.owner)?;
        tracing::info!(
            "Server started for owner {} ({} tier), found {} existing habits",
            self.config.owner,
            self.config.tier.as_str(),
            habits
        );

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await?;

        Ok(())
    }

    /// Context for a request made now by the configured owner
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(self.config.owner, self.config.tier).with_policy(self.config.policy)
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
