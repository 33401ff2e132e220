/// HabitLog entity: what happened with a habit on one calendar date
///
/// There is at most one log per (habit, date). A log is created the first
/// time a date is recorded, changed in place when its status changes, and
/// deleted when a completion is unmarked.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use crate::domain::{validate_numeric, DomainError, HabitId, LogId, LogStatus};

/// Longest note accepted on a log
pub const MAX_NOTES_LEN: usize = 1000;

/// A record of a habit's outcome on a specific day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitLog {
    /// Unique identifier for this log
    pub id: LogId,
    /// Which habit this log belongs to
    pub habit_id: HabitId,
    /// The calendar date this log is for
    pub date: NaiveDate,
    /// Completed, skipped or partial
    pub status: LogStatus,
    /// Amount achieved (pages, minutes, ...)
    pub value: Option<f64>,
    /// Free-form notes
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HabitLog {
    /// Create a new log with validation
    pub fn new(
        habit_id: HabitId,
        date: NaiveDate,
        status: LogStatus,
        value: Option<f64>,
        notes: Option<String>,
    ) -> Result<Self, DomainError> {
        validate_numeric(value, "Log value")?;
        let notes = Self::normalize_notes(notes)?;
        let now = Utc::now();

        Ok(Self {
            id: LogId::new(),
            habit_id,
            date,
            status,
            value,
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a log from stored data (no validation)
    #[allow(clippy::too_many_arguments)]
    pub fn from_existing(
        id: LogId,
        habit_id: HabitId,
        date: NaiveDate,
        status: LogStatus,
        value: Option<f64>,
        notes: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            habit_id,
            date,
            status,
            value,
            notes,
            created_at,
            updated_at,
        }
    }

    /// Change the status of this log in place
    ///
    /// Notes are only replaced when new ones are given.
    pub fn transition(
        &mut self,
        status: LogStatus,
        value: Option<f64>,
        notes: Option<String>,
    ) -> Result<(), DomainError> {
        validate_numeric(value, "Log value")?;
        let notes = Self::normalize_notes(notes)?;

        self.status = status;
        self.value = value;
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == LogStatus::Completed
    }

    fn normalize_notes(notes: Option<String>) -> Result<Option<String>, DomainError> {
        match notes {
            Some(text) => {
                let trimmed = text.trim();
                if trimmed.chars().count() > MAX_NOTES_LEN {
                    return Err(DomainError::Validation {
                        message: format!("Notes cannot be longer than {} characters", MAX_NOTES_LEN),
                    });
                }
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            None => Ok(None),
        }
    }
}
