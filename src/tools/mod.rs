/// Command handlers for habit management
///
/// Each submodule exposes `Params`/`Response` types and a function generic
/// over `HabitStorage`. Handlers that mutate run inside one storage
/// transaction and retry it when storage reports a write conflict.

pub mod analytics;
pub mod complete;
pub mod create;
pub mod export;
pub mod groups;
pub mod list;
pub mod log;
pub mod recalculate;
pub mod status;
pub mod subscription;
pub mod update;

// Re-export tool functions for easy access
pub use analytics::*;
pub use complete::*;
pub use create::*;
pub use export::*;
pub use groups::*;
pub use list::*;
pub use log::*;
pub use recalculate::*;
pub use status::*;
pub use subscription::*;
pub use update::*;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::RequestContext;
use crate::domain::{parse_date, DomainError, Feature, GroupId, Habit, HabitId, HabitStatistics};
use crate::storage::{HabitStorage, StorageError};

/// How many times a command is attempted when storage reports a conflict
pub const MAX_ATTEMPTS: u32 = 3;

/// Errors returned by command handlers
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("Not authorized to access {0}")]
    Authorization(String),

    #[error("Plan limit reached: {0}")]
    LimitReached(String),

    #[error("Your plan does not include {0}")]
    FeatureUnavailable(Feature),

    #[error("Storage error, please retry: {0}")]
    Storage(StorageError),
}

impl CommandError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CommandError::Storage(e) if e.is_conflict())
    }

    fn validation(message: impl Into<String>) -> Self {
        CommandError::Validation(DomainError::Validation { message: message.into() })
    }
}

impl From<StorageError> for CommandError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::HabitNotFound { habit_id } => CommandError::NotFound(format!("habit {}", habit_id)),
            StorageError::GroupNotFound { group_id } => CommandError::NotFound(format!("group {}", group_id)),
            StorageError::DuplicateGroup { name } => {
                CommandError::validation(format!("A group named '{}' already exists", name))
            }
            other => CommandError::Storage(other),
        }
    }
}

/// Statistics as reported to callers, completion rate included
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub streak: u32,
    pub longest_streak: u32,
    pub total_completions: u32,
    pub total_skips: u32,
    /// Percentage with two decimals
    pub completion_rate: f64,
}

impl From<HabitStatistics> for StatisticsSummary {
    fn from(stats: HabitStatistics) -> Self {
        Self {
            streak: stats.streak,
            longest_streak: stats.longest_streak,
            total_completions: stats.total_completions,
            total_skips: stats.total_skips,
            completion_rate: stats.completion_rate(),
        }
    }
}

/// Parameters naming a single habit
#[derive(Debug, Deserialize, JsonSchema)]
pub struct HabitRefParams {
    /// ID of the habit
    pub habit_id: String,
}

/// Parse a habit ID supplied by the caller
pub(crate) fn parse_habit_id(raw: &str) -> Result<HabitId, CommandError> {
    HabitId::from_string(raw)
        .map_err(|_| CommandError::validation(format!("'{}' is not a valid habit ID", raw)))
}

pub(crate) fn parse_group_id(raw: &str) -> Result<GroupId, CommandError> {
    GroupId::from_string(raw)
        .map_err(|_| CommandError::validation(format!("'{}' is not a valid group ID", raw)))
}

/// Resolve an optional `YYYY-MM-DD` date, defaulting to the requester's today
pub(crate) fn resolve_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, CommandError> {
    match raw {
        Some(s) => Ok(parse_date(s)?),
        None => Ok(today),
    }
}

/// Load a habit and make sure the requester owns it
pub(crate) fn load_owned_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    habit_id: &HabitId,
) -> Result<Habit, CommandError> {
    let habit = storage.get_habit(habit_id)?;
    if !habit.is_owned_by(&ctx.owner) {
        tracing::warn!("Owner {} tried to access habit {} owned by someone else", ctx.owner, habit_id);
        return Err(CommandError::Authorization(format!("habit {}", habit_id)));
    }
    Ok(habit)
}

/// Reject a command when the requester's tier lacks a feature
pub(crate) fn require_feature(ctx: &RequestContext, feature: Feature) -> Result<(), CommandError> {
    if ctx.tier.allows(feature) {
        Ok(())
    } else {
        Err(CommandError::FeatureUnavailable(feature))
    }
}

/// Run a transactional command, retrying it when storage reports a conflict
pub(crate) fn retry_on_conflict<T, F>(mut attempt: F) -> Result<T, CommandError>
where
    F: FnMut() -> Result<T, CommandError>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt() {
            Err(e) if e.is_retryable() && tries < MAX_ATTEMPTS => {
                tracing::warn!("Write conflict on attempt {}/{}, retrying: {}", tries, MAX_ATTEMPTS, e);
            }
            result => return result,
        }
    }
}
