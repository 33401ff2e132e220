/// Export and import of a single habit with its full log history
///
/// The export document carries the habit's configuration, its logs and the
/// statistics cached at export time. Importing creates a new habit for the
/// requester, writes the logs and recalculates, so statistics recomputed on
/// the same reference date match the exported ones.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{DomainError, Feature, Habit, HabitConfig, HabitLog, HabitStatistics, LogStatus};
use crate::storage::HabitStorage;
use crate::tools::{
    load_owned_habit, parse_habit_id, refresh_statistics, require_feature, retry_on_conflict,
    CommandError, HabitRefParams, StatisticsSummary,
};

/// Version written into every export document
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// A habit and its history, as exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitExport {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    /// The exporter's today; statistics below are relative to it
    pub reference_date: NaiveDate,
    pub habit: ExportedHabit,
    pub statistics: HabitStatistics,
    /// Oldest first
    pub logs: Vec<ExportedLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedHabit {
    pub name: String,
    pub description: Option<String>,
    pub config: HabitConfig,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedLog {
    pub date: NaiveDate,
    pub status: LogStatus,
    pub value: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportHabitResponse {
    pub success: bool,
    pub export: HabitExport,
    pub message: String,
}

/// Parameters for importing a habit
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImportHabitParams {
    /// A document produced by export_habit
    pub export: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ImportHabitResponse {
    pub success: bool,
    pub habit_id: String,
    pub imported_logs: usize,
    pub statistics: StatisticsSummary,
    pub message: String,
}

/// Export one of the requester's habits with all of its logs
pub fn export_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: HabitRefParams,
) -> Result<ExportHabitResponse, CommandError> {
    require_feature(ctx, Feature::Export)?;
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = load_owned_habit(storage, ctx, &habit_id)?;

    let mut logs = storage.list_logs(&habit_id, None)?;
    logs.sort_by_key(|log| log.date);

    let export = HabitExport {
        format_version: EXPORT_FORMAT_VERSION,
        exported_at: ctx.now,
        reference_date: ctx.today,
        statistics: *habit.statistics(),
        logs: logs
            .into_iter()
            .map(|log| ExportedLog {
                date: log.date,
                status: log.status,
                value: log.value,
                notes: log.notes,
            })
            .collect(),
        habit: ExportedHabit {
            name: habit.name.clone(),
            description: habit.description.clone(),
            config: habit.config.clone(),
            is_archived: habit.is_archived,
            created_at: habit.created_at,
        },
    };

    tracing::info!("Exported habit {} with {} logs", habit_id, export.logs.len());

    Ok(ExportHabitResponse {
        success: true,
        message: format!("📤 Exported '{}' with {} logs", habit.name, export.logs.len()),
        export,
    })
}

/// Import an exported habit as a new habit of the requester
pub fn import_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: ImportHabitParams,
) -> Result<ImportHabitResponse, CommandError> {
    require_feature(ctx, Feature::Export)?;
    let export: HabitExport = serde_json::from_value(params.export).map_err(|e| invalid(format!("Malformed export: {}", e)))?;
    if export.format_version != EXPORT_FORMAT_VERSION {
        return Err(invalid(format!(
            "Unsupported export format version {} (expected {})",
            export.format_version, EXPORT_FORMAT_VERSION
        )));
    }

    let mut habit = Habit::new(
        ctx.owner,
        None,
        export.habit.name.clone(),
        export.habit.description.clone(),
        export.habit.config.clone(),
    )?;
    if export.habit.is_archived {
        habit.archive(ctx.now);
    }

    let mut seen = BTreeSet::new();
    let mut logs = Vec::with_capacity(export.logs.len());
    for entry in &export.logs {
        if !seen.insert(entry.date) {
            return Err(invalid(format!("Export has more than one log for {}", entry.date)));
        }
        logs.push(HabitLog::new(habit.id, entry.date, entry.status, entry.value, entry.notes.clone())?);
    }

    let statistics = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let max_habits = ctx.tier.features().max_habits;
            if tx.count_habits(&ctx.owner)? >= max_habits {
                return Err(CommandError::LimitReached(format!(
                    "the {} plan allows {} habits",
                    ctx.tier.as_str(),
                    max_habits
                )));
            }
            let mut habit = habit.clone();
            tx.create_habit(&habit)?;
            for log in &logs {
                tx.upsert_log(log)?;
            }
            Ok(refresh_statistics(tx, &mut habit, ctx)?)
        })
    })?;

    tracing::info!("Imported habit {} with {} logs for owner {}", habit.id, logs.len(), ctx.owner);

    Ok(ImportHabitResponse {
        success: true,
        habit_id: habit.id.to_string(),
        imported_logs: logs.len(),
        statistics: statistics.into(),
        message: format!("📥 Imported '{}' with {} logs", habit.name, logs.len()),
    })
}

fn invalid(message: String) -> CommandError {
    CommandError::Validation(DomainError::Validation { message })
}
