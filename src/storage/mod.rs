/// Storage layer for persisting habit data
///
/// This module handles all database operations using SQLite. It provides
/// the repository-style queries the command handlers need: one bulk fetch
/// of completed dates per recalculation, upsert/delete of the single log per
/// (habit, date), and a transaction boundary around each command.

pub mod sqlite;
pub mod migrations;

// Re-export the main storage types
pub use sqlite::*;

use chrono::NaiveDate;
use thiserror::Error;
use crate::domain::{
    CompletedDates, GroupId, Habit, HabitGroup, HabitId, HabitLog, HabitStatistics, OwnerId,
    StatusTally,
};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Group not found: {group_id}")]
    GroupNotFound { group_id: String },

    #[error("Duplicate group: '{name}' already exists")]
    DuplicateGroup { name: String },

    #[error("Write conflict, please retry: {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// Whether retrying the whole transaction may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict(_))
    }
}

/// Filters for listing an owner's habits
#[derive(Debug, Clone, Copy, Default)]
pub struct HabitFilter {
    pub group_id: Option<GroupId>,
    pub include_archived: bool,
}

/// Trait defining the storage interface for habits
///
/// Statistics are never computed here; storage only supplies the snapshot
/// (`completed_dates_in_range` + `status_tally`) and persists what the
/// aggregate derived from it.
pub trait HabitStorage {
    /// Run `f` inside a single transaction; any error rolls everything back
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StorageError>;

    /// Create a new habit
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Get a habit by ID
    fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError>;

    /// Update configuration and lifecycle fields of an existing habit
    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Delete a habit together with all its logs
    fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StorageError>;

    /// List an owner's habits
    fn list_habits(&self, owner_id: &OwnerId, filter: HabitFilter) -> Result<Vec<Habit>, StorageError>;

    /// Number of habits an owner has (archived included)
    fn count_habits(&self, owner_id: &OwnerId) -> Result<u32, StorageError>;

    /// Write the four cached statistics fields of a habit
    fn save_statistics(&self, habit_id: &HabitId, statistics: &HabitStatistics) -> Result<(), StorageError>;

    /// Create a group; names are unique per owner
    fn create_group(&self, group: &HabitGroup) -> Result<(), StorageError>;

    fn get_group(&self, group_id: &GroupId) -> Result<HabitGroup, StorageError>;

    fn list_groups(&self, owner_id: &OwnerId) -> Result<Vec<HabitGroup>, StorageError>;

    fn count_groups(&self, owner_id: &OwnerId) -> Result<u32, StorageError>;

    /// Delete a group; its habits stay with no group
    fn delete_group(&self, group_id: &GroupId) -> Result<(), StorageError>;

    /// Find the log for (habit, date), if any
    fn find_log(&self, habit_id: &HabitId, date: NaiveDate) -> Result<Option<HabitLog>, StorageError>;

    /// Insert the log, or update the existing row for the same (habit, date)
    fn upsert_log(&self, log: &HabitLog) -> Result<(), StorageError>;

    /// Delete the log for (habit, date); returns whether a row was removed
    fn delete_log(&self, habit_id: &HabitId, date: NaiveDate) -> Result<bool, StorageError>;

    /// Logs for a habit, newest first
    fn list_logs(&self, habit_id: &HabitId, limit: Option<u32>) -> Result<Vec<HabitLog>, StorageError>;

    /// All logs of an owner's habits within a date range (inclusive)
    fn list_owner_logs_in_range(
        &self,
        owner_id: &OwnerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitLog>, StorageError>;

    /// Dates with a completed log for a habit within a range (inclusive)
    fn completed_dates_in_range(
        &self,
        habit_id: &HabitId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CompletedDates, StorageError>;

    /// Count of logs per status over the habit's whole history
    fn status_tally(&self, habit_id: &HabitId) -> Result<StatusTally, StorageError>;

    /// Count of logs per status over all of an owner's habits
    fn owner_status_tally(&self, owner_id: &OwnerId) -> Result<StatusTally, StorageError>;
}
