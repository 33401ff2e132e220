/// Statistics recalculation
///
/// Every mutation that touches logs ends by calling `refresh_statistics`
/// inside the same transaction. The `recalculate_statistics` tool runs the
/// same routine on demand, for one habit or for all of an owner's habits.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{Habit, HabitId, HabitStatistics, LogHistory, StreakPolicy};
use crate::storage::{HabitFilter, HabitStorage, StorageError};
use crate::tools::{load_owned_habit, parse_habit_id, retry_on_conflict, CommandError, StatisticsSummary};

/// Parameters for recalculating statistics
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RecalculateParams {
    /// Habit to recalculate; all of the owner's habits when omitted
    pub habit_id: Option<String>,
}

/// Fresh statistics for one habit
#[derive(Debug, Serialize)]
pub struct RecalculatedHabit {
    pub habit_id: String,
    pub name: String,
    pub statistics: StatisticsSummary,
}

#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub success: bool,
    pub habits: Vec<RecalculatedHabit>,
    pub message: String,
}

/// Fetch the snapshot the streak calculator needs, in two queries
pub fn load_history<S: HabitStorage>(
    storage: &S,
    habit_id: &HabitId,
    today: NaiveDate,
    policy: &StreakPolicy,
) -> Result<LogHistory, StorageError> {
    let completed_dates = storage.completed_dates_in_range(habit_id, policy.window_start(today), today)?;
    let tally = storage.status_tally(habit_id)?;
    Ok(LogHistory { completed_dates, tally })
}

/// Recompute a habit's cached statistics from storage and persist them
pub fn refresh_statistics<S: HabitStorage>(
    storage: &S,
    habit: &mut Habit,
    ctx: &RequestContext,
) -> Result<HabitStatistics, StorageError> {
    let history = load_history(storage, &habit.id, ctx.today, &ctx.policy)?;
    let statistics = habit.recalculate_statistics(&history, ctx.today, &ctx.policy);
    storage.save_statistics(&habit.id, &statistics)?;

    tracing::debug!(
        "Recalculated habit {}: streak={} longest={} completions={} skips={}",
        habit.id,
        statistics.streak,
        statistics.longest_streak,
        statistics.total_completions,
        statistics.total_skips
    );
    Ok(statistics)
}

/// Recalculate one habit, or every habit the requester owns
pub fn recalculate_statistics<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: RecalculateParams,
) -> Result<RecalculateResponse, CommandError> {
    let habit_id = params.habit_id.as_deref().map(parse_habit_id).transpose()?;

    let habits = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let mut habits = match habit_id {
                Some(id) => vec![load_owned_habit(tx, ctx, &id)?],
                None => tx.list_habits(&ctx.owner, HabitFilter { include_archived: true, ..Default::default() })?,
            };

            let mut results = Vec::with_capacity(habits.len());
            for habit in habits.iter_mut() {
                let statistics = refresh_statistics(tx, habit, ctx)?;
                results.push(RecalculatedHabit {
                    habit_id: habit.id.to_string(),
                    name: habit.name.clone(),
                    statistics: statistics.into(),
                });
            }
            Ok::<_, CommandError>(results)
        })
    })?;

    tracing::info!("Recalculated statistics for {} habit(s) of owner {}", habits.len(), ctx.owner);

    Ok(RecalculateResponse {
        success: true,
        message: format!(
            "🔄 Recalculated statistics for {} habit{}",
            habits.len(),
            if habits.len() == 1 { "" } else { "s" }
        ),
        habits,
    })
}
