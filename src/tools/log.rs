/// Tools for recording a day's outcome with any status and reading logs back
///
/// `log_habit` is the general form of `mark_complete`: it writes the single
/// log for (habit, date) with the given status, transitioning an existing
/// log in place, and then refreshes the cached statistics.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{HabitLog, LogStatus, DATE_FORMAT};
use crate::storage::HabitStorage;
use crate::tools::{
    load_owned_habit, parse_habit_id, refresh_statistics, resolve_date, retry_on_conflict,
    CommandError, StatisticsSummary,
};

/// Default number of logs returned by `list_logs`
const DEFAULT_LOG_LIMIT: u32 = 30;

/// Parameters for logging a habit's outcome on a date
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LogHabitParams {
    /// ID of the habit
    pub habit_id: String,
    /// completed, skipped or partial
    pub status: String,
    /// Date in YYYY-MM-DD format, defaults to today
    pub date: Option<String>,
    /// Amount achieved (pages, minutes, ...)
    pub value: Option<f64>,
    pub notes: Option<String>,
}

/// Response from logging a habit
#[derive(Debug, Serialize)]
pub struct LogHabitResponse {
    pub success: bool,
    pub log_id: String,
    pub date: String,
    pub status: LogStatus,
    /// Status of the log this one replaced, if any
    pub previous_status: Option<LogStatus>,
    pub statistics: StatisticsSummary,
    pub message: String,
}

/// Parameters for listing a habit's logs
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListLogsParams {
    /// ID of the habit
    pub habit_id: String,
    /// Maximum number of logs, newest first (default 30)
    pub limit: Option<u32>,
}

/// A log as shown to callers
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub id: String,
    pub date: String,
    pub status: LogStatus,
    pub value: Option<f64>,
    pub notes: Option<String>,
}

impl From<&HabitLog> for LogEntry {
    fn from(log: &HabitLog) -> Self {
        Self {
            id: log.id.to_string(),
            date: log.date.format(DATE_FORMAT).to_string(),
            status: log.status,
            value: log.value,
            notes: log.notes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListLogsResponse {
    pub habit_id: String,
    pub habit_name: String,
    pub logs: Vec<LogEntry>,
}

/// Record the outcome for a habit on a date
pub fn log_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: LogHabitParams,
) -> Result<LogHabitResponse, CommandError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let status: LogStatus = params.status.parse()?;
    let date = resolve_date(params.date.as_deref(), ctx.today)?;

    let (log, previous_status, statistics) = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let mut habit = load_owned_habit(tx, ctx, &habit_id)?;

            let (log, previous_status) = match tx.find_log(&habit_id, date)? {
                Some(mut log) => {
                    let previous = log.status;
                    log.transition(status, params.value, params.notes.clone())?;
                    (log, Some(previous))
                }
                None => (HabitLog::new(habit_id, date, status, params.value, params.notes.clone())?, None),
            };
            tx.upsert_log(&log)?;

            let statistics = refresh_statistics(tx, &mut habit, ctx)?;
            Ok::<_, CommandError>((log, previous_status, statistics))
        })
    })?;

    tracing::info!("Logged habit {} as {} on {}", habit_id, status.as_str(), date);

    Ok(LogHabitResponse {
        success: true,
        log_id: log.id.to_string(),
        date: date.format(DATE_FORMAT).to_string(),
        status,
        previous_status,
        message: format!(
            "📝 Logged {} for {}. Current streak: {}",
            status.as_str(),
            date.format(DATE_FORMAT),
            statistics.streak
        ),
        statistics: statistics.into(),
    })
}

/// Most recent logs of a habit
pub fn list_logs<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: ListLogsParams,
) -> Result<ListLogsResponse, CommandError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = load_owned_habit(storage, ctx, &habit_id)?;
    let logs = storage.list_logs(&habit_id, Some(params.limit.unwrap_or(DEFAULT_LOG_LIMIT)))?;

    Ok(ListLogsResponse {
        habit_id: habit_id.to_string(),
        habit_name: habit.name,
        logs: logs.iter().map(LogEntry::from).collect(),
    })
}
