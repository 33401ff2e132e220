/// Tool for checking habit status and streaks
///
/// Reads the cached statistics by default. With `recompute` set, the
/// statistics are derived fresh from the log history for the requester's
/// today without writing anything back.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{Habit, HabitStatistics, LogStatus};
use crate::storage::{HabitFilter, HabitStorage};
use crate::tools::{load_history, load_owned_habit, parse_habit_id, CommandError, StatisticsSummary};

/// Parameters for checking habit status
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct StatusParams {
    /// Habit to check; all active habits when omitted
    pub habit_id: Option<String>,
    /// Derive statistics from the log history instead of the cache
    pub recompute: Option<bool>,
}

/// Information about a single habit's status
#[derive(Debug, Serialize)]
pub struct HabitStatus {
    pub habit_id: String,
    pub name: String,
    pub is_archived: bool,
    /// Status of today's log, if any
    pub today: Option<LogStatus>,
    pub statistics: StatisticsSummary,
    /// "done_today", "pending" or "new"
    pub status: String,
}

/// Response from checking habit status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub habits: Vec<HabitStatus>,
    /// "cached" or "recomputed"
    pub source: String,
    pub message: String,
}

/// Get status for one habit or all of the requester's active habits
pub fn get_habit_status<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: StatusParams,
) -> Result<StatusResponse, CommandError> {
    let habits = match params.habit_id.as_deref() {
        Some(raw) => vec![load_owned_habit(storage, ctx, &parse_habit_id(raw)?)?],
        None => storage.list_habits(&ctx.owner, HabitFilter::default())?,
    };
    let recompute = params.recompute.unwrap_or(false);

    let mut statuses = Vec::with_capacity(habits.len());
    for habit in &habits {
        let statistics = if recompute {
            let history = load_history(storage, &habit.id, ctx.today, &ctx.policy)?;
            HabitStatistics::calculate(&history, ctx.today, &ctx.policy)
        } else {
            *habit.statistics()
        };
        let today = storage.find_log(&habit.id, ctx.today)?.map(|log| log.status);
        statuses.push(status_of(habit, today, statistics));
    }

    let done = statuses.iter().filter(|s| s.today == Some(LogStatus::Completed)).count();
    let message = if statuses.is_empty() {
        "No habits yet. Create one to start a streak!".to_string()
    } else {
        format!("{}/{} habits done today", done, statuses.len())
    };

    Ok(StatusResponse {
        habits: statuses,
        source: if recompute { "recomputed" } else { "cached" }.to_string(),
        message,
    })
}

fn status_of(habit: &Habit, today: Option<LogStatus>, statistics: HabitStatistics) -> HabitStatus {
    let status = if today == Some(LogStatus::Completed) {
        "done_today"
    } else if statistics.total_completions == 0 && statistics.total_skips == 0 {
        "new"
    } else {
        "pending"
    };

    HabitStatus {
        habit_id: habit.id.to_string(),
        name: habit.name.clone(),
        is_archived: habit.is_archived,
        today,
        statistics: statistics.into(),
        status: status.to_string(),
    }
}
