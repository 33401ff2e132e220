/// Tool for listing the requester's habits
///
/// This module implements the list_habits MCP tool. Statistics come from
/// each habit's cache; nothing is recalculated here.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{round_2, Habit};
use crate::storage::{HabitFilter, HabitStorage};
use crate::tools::{parse_group_id, CommandError, StatisticsSummary};

/// Parameters for listing habits
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListHabitsParams {
    /// Only habits in this group
    pub group_id: Option<String>,
    /// Include archived habits (default false)
    pub include_archived: Option<bool>,
    /// name, streak, created_at or completion_rate (default created_at)
    pub sort_by: Option<String>,
}

/// Information about a habit in the list
#[derive(Debug, Serialize)]
pub struct HabitSummary {
    pub habit_id: String,
    pub name: String,
    pub habit_type: String,
    pub frequency: String,
    pub target: Option<String>,
    pub group_id: Option<String>,
    pub is_archived: bool,
    pub statistics: StatisticsSummary,
}

impl From<&Habit> for HabitSummary {
    fn from(habit: &Habit) -> Self {
        Self {
            habit_id: habit.id.to_string(),
            name: habit.name.clone(),
            habit_type: habit.config.habit_type.as_str().to_string(),
            frequency: habit.config.frequency.as_str().to_string(),
            target: habit.target_display(),
            group_id: habit.group_id.map(|g| g.to_string()),
            is_archived: habit.is_archived,
            statistics: (*habit.statistics()).into(),
        }
    }
}

/// Summary statistics for all listed habits
#[derive(Debug, Serialize)]
pub struct HabitListSummary {
    pub total_habits: u32,
    pub active_habits: u32,
    pub archived_habits: u32,
    pub avg_completion_rate: f64,
}

/// Response from listing habits
#[derive(Debug, Serialize)]
pub struct ListHabitsResponse {
    pub habits: Vec<HabitSummary>,
    pub summary: HabitListSummary,
}

/// List the requester's habits
pub fn list_habits<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: ListHabitsParams,
) -> Result<ListHabitsResponse, CommandError> {
    let filter = HabitFilter {
        group_id: params.group_id.as_deref().map(parse_group_id).transpose()?,
        include_archived: params.include_archived.unwrap_or(false),
    };

    let mut habits = storage.list_habits(&ctx.owner, filter)?;
    match params.sort_by.as_deref().map(str::trim) {
        Some("name") => habits.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        Some("streak") => habits.sort_by(|a, b| b.statistics().streak.cmp(&a.statistics().streak)),
        Some("completion_rate") => habits.sort_by(|a, b| b.completion_rate().total_cmp(&a.completion_rate())),
        Some("created_at") | None => habits.sort_by_key(|h| h.created_at),
        Some(other) => {
            return Err(CommandError::Validation(crate::domain::DomainError::Validation {
                message: format!(
                    "Invalid sort '{}'. Valid options: name, streak, created_at, completion_rate",
                    other
                ),
            }))
        }
    }

    let summaries: Vec<HabitSummary> = habits.iter().map(HabitSummary::from).collect();

    let total_habits = summaries.len() as u32;
    let archived_habits = summaries.iter().filter(|h| h.is_archived).count() as u32;
    let avg_completion_rate = if summaries.is_empty() {
        0.0
    } else {
        round_2(summaries.iter().map(|h| h.statistics.completion_rate).sum::<f64>() / summaries.len() as f64)
    };

    Ok(ListHabitsResponse {
        habits: summaries,
        summary: HabitListSummary {
            total_habits,
            active_habits: total_habits - archived_habits,
            archived_habits,
            avg_completion_rate,
        },
    })
}
