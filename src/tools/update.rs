/// Tools for updating, archiving and deleting existing habits
///
/// Updates never touch the log history or the cached statistics; archiving
/// keeps all logs, deleting removes them together with the habit.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{Frequency, HabitConfig, HabitType};
use crate::storage::HabitStorage;
use crate::tools::create::{check_group, parse_custom_days};
use crate::tools::{
    load_owned_habit, parse_group_id, parse_habit_id, retry_on_conflict, CommandError, HabitRefParams,
};

/// Parameters for updating an existing habit
///
/// Omitted fields are left as they are. An empty `description` or
/// `group_id` clears the field.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateHabitParams {
    /// ID of the habit
    pub habit_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub group_id: Option<String>,
    pub habit_type: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub frequency: Option<String>,
    pub custom_days: Option<Vec<String>>,
}

/// Response from updating a habit
#[derive(Debug, Serialize)]
pub struct UpdateHabitResponse {
    pub success: bool,
    pub habit_id: String,
    pub message: String,
}

/// Response from archiving or unarchiving a habit
#[derive(Debug, Serialize)]
pub struct ArchiveHabitResponse {
    pub success: bool,
    pub habit_id: String,
    pub is_archived: bool,
    pub archived_at: Option<String>,
    pub message: String,
}

impl UpdateHabitParams {
    fn touches_config(&self) -> bool {
        self.habit_type.is_some()
            || self.target_value.is_some()
            || self.unit.is_some()
            || self.frequency.is_some()
            || self.custom_days.is_some()
    }

    /// Merge the config fields given into `current`
    fn merged_config(&self, current: &HabitConfig) -> Result<HabitConfig, CommandError> {
        let mut config = current.clone();
        if let Some(habit_type) = &self.habit_type {
            config.habit_type = habit_type.parse::<HabitType>()?;
        }
        if let Some(target) = self.target_value {
            config.target_value = Some(target);
        }
        if let Some(unit) = &self.unit {
            config.unit = Some(unit.trim().to_string());
        }
        if let Some(frequency) = &self.frequency {
            config.frequency = frequency.parse::<Frequency>()?;
            if config.frequency != Frequency::Custom && self.custom_days.is_none() {
                config.custom_days.clear();
            }
        }
        if let Some(days) = &self.custom_days {
            config.custom_days = parse_custom_days(days)?;
        }
        Ok(config)
    }
}

/// Update an existing habit's configuration
pub fn update_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: UpdateHabitParams,
) -> Result<UpdateHabitResponse, CommandError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let group_id = match params.group_id.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(raw) => Some(Some(parse_group_id(raw)?)),
    };
    let description = params
        .description
        .as_ref()
        .map(|d| Some(d.trim().to_string()).filter(|d| !d.is_empty()));

    let habit = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let mut habit = load_owned_habit(tx, ctx, &habit_id)?;
            if let Some(Some(group_id)) = &group_id {
                check_group(tx, ctx, group_id)?;
            }
            let config = if params.touches_config() {
                Some(params.merged_config(&habit.config)?)
            } else {
                None
            };

            habit.update(params.name.clone(), description.clone(), group_id, config)?;
            tx.update_habit(&habit)?;
            Ok::<_, CommandError>(habit)
        })
    })?;

    tracing::info!("Updated habit {}", habit.id);

    Ok(UpdateHabitResponse {
        success: true,
        habit_id: habit.id.to_string(),
        message: format!("✅ Updated habit '{}'", habit.name),
    })
}

/// Archive a habit; it keeps its logs and statistics
pub fn archive_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: HabitRefParams,
) -> Result<ArchiveHabitResponse, CommandError> {
    set_archived(storage, ctx, params, true)
}

/// Bring an archived habit back
pub fn unarchive_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: HabitRefParams,
) -> Result<ArchiveHabitResponse, CommandError> {
    set_archived(storage, ctx, params, false)
}

fn set_archived<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: HabitRefParams,
    archived: bool,
) -> Result<ArchiveHabitResponse, CommandError> {
    let habit_id = parse_habit_id(&params.habit_id)?;

    let habit = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let mut habit = load_owned_habit(tx, ctx, &habit_id)?;
            if habit.is_archived != archived {
                if archived {
                    habit.archive(ctx.now);
                } else {
                    habit.unarchive(ctx.now);
                }
                tx.update_habit(&habit)?;
            }
            Ok::<_, CommandError>(habit)
        })
    })?;

    let message = if archived {
        tracing::info!("Archived habit {}", habit.id);
        format!("📦 Archived habit '{}'", habit.name)
    } else {
        tracing::info!("Unarchived habit {}", habit.id);
        format!("▶️ Reactivated habit '{}'", habit.name)
    };

    Ok(ArchiveHabitResponse {
        success: true,
        habit_id: habit.id.to_string(),
        is_archived: habit.is_archived,
        archived_at: habit.archived_at.map(|t| t.to_rfc3339()),
        message,
    })
}

/// Delete a habit and its whole log history
pub fn delete_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: HabitRefParams,
) -> Result<UpdateHabitResponse, CommandError> {
    let habit_id = parse_habit_id(&params.habit_id)?;

    let habit = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let habit = load_owned_habit(tx, ctx, &habit_id)?;
            tx.delete_habit(&habit_id)?;
            Ok::<_, CommandError>(habit)
        })
    })?;

    tracing::info!("Deleted habit {}", habit_id);

    Ok(UpdateHabitResponse {
        success: true,
        habit_id: habit_id.to_string(),
        message: format!("🗑️ Deleted habit '{}'", habit.name),
    })
}
