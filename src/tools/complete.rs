/// Tools for marking and unmarking a habit as completed on a date
///
/// Both commands are idempotent: marking an already completed date and
/// unmarking a date that is not completed succeed without touching storage,
/// and report the no-op through a flag in the response.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{HabitLog, LogStatus, DATE_FORMAT};
use crate::storage::HabitStorage;
use crate::tools::{
    load_owned_habit, parse_habit_id, refresh_statistics, resolve_date, retry_on_conflict,
    CommandError, StatisticsSummary,
};

/// Value recorded on a completion when none is given
pub const DEFAULT_COMPLETION_VALUE: f64 = 1.0;

/// Parameters for marking a habit completed
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MarkCompleteParams {
    /// ID of the habit
    pub habit_id: String,
    /// Date in YYYY-MM-DD format, defaults to today
    pub date: Option<String>,
    /// Amount achieved, defaults to 1
    pub value: Option<f64>,
    /// Optional notes about this completion
    pub notes: Option<String>,
}

/// Parameters for unmarking a completion
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UnmarkCompleteParams {
    /// ID of the habit
    pub habit_id: String,
    /// Date in YYYY-MM-DD format, defaults to today
    pub date: Option<String>,
}

/// What `mark_complete` did to the log for the date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MarkOutcome {
    /// No log existed; a completed one was created
    Created,
    /// An existing skipped or partial log became completed
    Transitioned { previous: LogStatus },
    /// The date was already completed; nothing changed
    AlreadyCompleted,
}

/// What `unmark_complete` did to the log for the date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmarkOutcome {
    /// The completed log was deleted
    Removed,
    /// There was no completed log for the date; nothing changed
    NotCompleted,
}

#[derive(Debug, Serialize)]
pub struct MarkCompleteResponse {
    pub success: bool,
    pub habit_id: String,
    pub date: String,
    pub outcome: MarkOutcome,
    pub already_completed: bool,
    pub statistics: StatisticsSummary,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UnmarkCompleteResponse {
    pub success: bool,
    pub habit_id: String,
    pub date: String,
    pub outcome: UnmarkOutcome,
    pub was_not_completed: bool,
    pub statistics: StatisticsSummary,
    pub message: String,
}

/// Mark a habit completed on a date (today by default)
pub fn mark_complete<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: MarkCompleteParams,
) -> Result<MarkCompleteResponse, CommandError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let date = resolve_date(params.date.as_deref(), ctx.today)?;
    let value = Some(params.value.unwrap_or(DEFAULT_COMPLETION_VALUE));

    let (outcome, statistics) = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let mut habit = load_owned_habit(tx, ctx, &habit_id)?;

            let outcome = match tx.find_log(&habit_id, date)? {
                Some(log) if log.is_completed() => return Ok((MarkOutcome::AlreadyCompleted, *habit.statistics())),
                Some(mut log) => {
                    let previous = log.status;
                    log.transition(LogStatus::Completed, value, params.notes.clone())?;
                    tx.upsert_log(&log)?;
                    MarkOutcome::Transitioned { previous }
                }
                None => {
                    let log = HabitLog::new(habit_id, date, LogStatus::Completed, value, params.notes.clone())?;
                    tx.upsert_log(&log)?;
                    MarkOutcome::Created
                }
            };

            let statistics = refresh_statistics(tx, &mut habit, ctx)?;
            Ok((outcome, statistics))
        })
    })?;

    let already_completed = outcome == MarkOutcome::AlreadyCompleted;
    let message = if already_completed {
        format!("Already completed on {}", date.format(DATE_FORMAT))
    } else {
        tracing::info!("Habit {} completed on {} ({:?})", habit_id, date, outcome);
        format!(
            "🔥 Marked complete! Current streak: {} day{}",
            statistics.streak,
            if statistics.streak == 1 { "" } else { "s" }
        )
    };

    Ok(MarkCompleteResponse {
        success: true,
        habit_id: habit_id.to_string(),
        date: date.format(DATE_FORMAT).to_string(),
        outcome,
        already_completed,
        statistics: statistics.into(),
        message,
    })
}

/// Remove the completion for a date (today by default)
///
/// Only a completed log is removed; a skipped or partial log for the date
/// is left alone and reported as not completed.
pub fn unmark_complete<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: UnmarkCompleteParams,
) -> Result<UnmarkCompleteResponse, CommandError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let date = resolve_date(params.date.as_deref(), ctx.today)?;

    let (outcome, statistics) = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let mut habit = load_owned_habit(tx, ctx, &habit_id)?;

            match tx.find_log(&habit_id, date)? {
                Some(log) if log.is_completed() => {
                    tx.delete_log(&habit_id, date)?;
                }
                _ => return Ok((UnmarkOutcome::NotCompleted, *habit.statistics())),
            }

            let statistics = refresh_statistics(tx, &mut habit, ctx)?;
            Ok::<_, CommandError>((UnmarkOutcome::Removed, statistics))
        })
    })?;

    let was_not_completed = outcome == UnmarkOutcome::NotCompleted;
    let message = if was_not_completed {
        format!("Was not completed on {}", date.format(DATE_FORMAT))
    } else {
        tracing::info!("Habit {} unmarked on {}", habit_id, date);
        format!("↩️ Unmarked completion. Current streak: {}", statistics.streak)
    };

    Ok(UnmarkCompleteResponse {
        success: true,
        habit_id: habit_id.to_string(),
        date: date.format(DATE_FORMAT).to_string(),
        outcome,
        was_not_completed,
        statistics: statistics.into(),
        message,
    })
}
