/// Analytics tools
///
/// Fetch the logs each report needs and hand them to the `AnalyticsEngine`.
/// Every report requires the analytics feature of the requester's tier.

use chrono::Datelike;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::analytics::{
    AnalyticsEngine, HabitProgress, MonthlyStats, OwnerSummary, WeeklyStats, DEFAULT_PROGRESS_DAYS,
};
use crate::context::RequestContext;
use crate::domain::{window_start, Feature};
use crate::storage::{HabitFilter, HabitStorage};
use crate::tools::{load_owned_habit, parse_habit_id, require_feature, CommandError};

/// Longest span accepted for a progress report
const MAX_PROGRESS_DAYS: u32 = 365;

/// Parameters for monthly statistics
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct MonthlyStatsParams {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// 1-12, defaults to the current month
    pub month: Option<u32>,
}

/// Parameters for a habit progress report
#[derive(Debug, Deserialize, JsonSchema)]
pub struct HabitProgressParams {
    /// ID of the habit
    pub habit_id: String,
    /// Number of days to cover, today included (default 30, max 365)
    pub days: Option<u32>,
}

/// Completions per weekday over the trailing week, across all habits
pub fn get_weekly_stats<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
) -> Result<WeeklyStats, CommandError> {
    require_feature(ctx, Feature::Analytics)?;
    let engine = AnalyticsEngine::new(ctx.today);
    let logs = storage.list_owner_logs_in_range(&ctx.owner, engine.week_start(), ctx.today)?;
    Ok(engine.weekly(&logs))
}

/// Completions per day of a calendar month, across all habits
pub fn get_monthly_stats<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: MonthlyStatsParams,
) -> Result<MonthlyStats, CommandError> {
    require_feature(ctx, Feature::Analytics)?;
    let year = params.year.unwrap_or_else(|| ctx.today.year());
    let month = params.month.unwrap_or_else(|| ctx.today.month());

    let (first, last) = AnalyticsEngine::month_range(year, month)?;
    let logs = storage.list_owner_logs_in_range(&ctx.owner, first, last)?;
    Ok(AnalyticsEngine::new(ctx.today).monthly(year, month, &logs)?)
}

/// Recent daily values of one habit next to its cached statistics
pub fn get_habit_progress<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: HabitProgressParams,
) -> Result<HabitProgress, CommandError> {
    require_feature(ctx, Feature::Analytics)?;
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = load_owned_habit(storage, ctx, &habit_id)?;
    let days = params.days.unwrap_or(DEFAULT_PROGRESS_DAYS).clamp(1, MAX_PROGRESS_DAYS);

    let start = window_start(ctx.today, days);
    let logs: Vec<_> = storage
        .list_logs(&habit_id, None)?
        .into_iter()
        .filter(|log| log.date >= start && log.date <= ctx.today)
        .collect();

    Ok(AnalyticsEngine::new(ctx.today).habit_progress(&habit, &logs, days))
}

/// Totals across all of the requester's habits
pub fn get_owner_summary<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
) -> Result<OwnerSummary, CommandError> {
    require_feature(ctx, Feature::Analytics)?;
    let filter = HabitFilter {
        include_archived: true,
        ..Default::default()
    };
    let habits = storage.list_habits(&ctx.owner, filter)?;
    let tally = storage.owner_status_tally(&ctx.owner)?;
    Ok(AnalyticsEngine::new(ctx.today).owner_summary(&habits, tally))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domain::{Habit, HabitConfig, OwnerId, SubscriptionTier};
    use crate::storage::SqliteStorage;
    use crate::tools::{mark_complete, MarkCompleteParams};

    fn setup(tier: SubscriptionTier) -> (SqliteStorage, RequestContext, Habit) {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let ctx = RequestContext::new(OwnerId::new(), tier).on(NaiveDate::from_ymd_opt(2024, 8, 14).unwrap());
        let habit = Habit::new(ctx.owner, None, "Stretch".to_string(), None, HabitConfig::default()).unwrap();
        storage.create_habit(&habit).unwrap();
        for date in ["2024-07-31", "2024-08-12", "2024-08-13", "2024-08-14"] {
            mark_complete(&storage, &ctx, MarkCompleteParams {
                habit_id: habit.id.to_string(),
                date: Some(date.to_string()),
                value: None,
                notes: None,
            }).unwrap();
        }
        (storage, ctx, habit)
    }

    #[test]
    fn test_analytics_requires_feature() {
        let (storage, ctx, _) = setup(SubscriptionTier::Free);
        assert!(matches!(
            get_weekly_stats(&storage, &ctx),
            Err(CommandError::FeatureUnavailable(Feature::Analytics))
        ));
        assert!(get_owner_summary(&storage, &ctx).is_err());
    }

    #[test]
    fn test_weekly_and_monthly() {
        let (storage, ctx, _) = setup(SubscriptionTier::Premium);

        let weekly = get_weekly_stats(&storage, &ctx).unwrap();
        assert_eq!(weekly.total_completed, 3);

        let monthly = get_monthly_stats(&storage, &ctx, MonthlyStatsParams::default()).unwrap();
        assert_eq!(monthly.month, 8);
        assert_eq!(monthly.days.len(), 31);
        assert_eq!(monthly.total_completed, 3);

        let july = get_monthly_stats(&storage, &ctx, MonthlyStatsParams { year: Some(2024), month: Some(7) }).unwrap();
        assert_eq!(july.total_completed, 1);
    }

    #[test]
    fn test_progress_and_summary() {
        let (storage, ctx, habit) = setup(SubscriptionTier::Family);

        let progress = get_habit_progress(&storage, &ctx, HabitProgressParams {
            habit_id: habit.id.to_string(),
            days: Some(7),
        }).unwrap();
        assert_eq!(progress.logged_days, 3);
        assert_eq!(progress.total_value, 3.0);
        assert_eq!(progress.statistics.streak, 3);

        let summary = get_owner_summary(&storage, &ctx).unwrap();
        assert_eq!(summary.total_habits, 1);
        assert_eq!(summary.completed_logs, 4);
        assert_eq!(summary.best_current_streak, 3);
        assert_eq!(summary.completion_rate, 100.0);
    }

    #[test]
    fn test_invalid_month_is_validation_error() {
        let (storage, ctx, _) = setup(SubscriptionTier::Premium);
        let result = get_monthly_stats(&storage, &ctx, MonthlyStatsParams { year: None, month: Some(0) });
        assert!(matches!(result, Err(CommandError::Validation(_))));
    }
}
