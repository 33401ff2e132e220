/// Tool for creating new habits
///
/// This module implements the create_habit MCP tool. Creation is gated by
/// the requester's tier: the count check and the insert share a transaction.

use chrono::Weekday;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{parse_weekday, DomainError, Frequency, GroupId, Habit, HabitConfig, HabitType};
use crate::storage::HabitStorage;
use crate::tools::{parse_group_id, retry_on_conflict, CommandError};

/// Parameters for creating a new habit
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CreateHabitParams {
    /// Name of the habit
    pub name: String,
    pub description: Option<String>,
    /// boolean, numeric, timer or negative (default boolean)
    pub habit_type: Option<String>,
    /// Daily goal for numeric and timer habits
    pub target_value: Option<f64>,
    /// Unit for the target (e.g. "minutes")
    pub unit: Option<String>,
    /// daily, weekly, monthly or custom (default daily)
    pub frequency: Option<String>,
    /// Weekdays for custom frequency (e.g. ["mon", "wed"])
    pub custom_days: Option<Vec<String>>,
    /// Group to put the habit in
    pub group_id: Option<String>,
}

/// Response from creating a habit
#[derive(Debug, Serialize)]
pub struct CreateHabitResponse {
    pub success: bool,
    pub habit_id: String,
    pub message: String,
}

/// Parse a list of weekday names
pub(crate) fn parse_custom_days(days: &[String]) -> Result<Vec<Weekday>, DomainError> {
    days.iter().map(|d| parse_weekday(d)).collect()
}

/// Make sure a group exists and belongs to the requester
pub(crate) fn check_group<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    group_id: &GroupId,
) -> Result<(), CommandError> {
    let group = storage.get_group(group_id)?;
    if group.owner_id != ctx.owner {
        return Err(CommandError::Authorization(format!("group {}", group_id)));
    }
    Ok(())
}

/// Create a new habit for the requester
pub fn create_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: CreateHabitParams,
) -> Result<CreateHabitResponse, CommandError> {
    let config = HabitConfig {
        habit_type: params.habit_type.as_deref().map(str::parse::<HabitType>).transpose()?.unwrap_or_default(),
        target_value: params.target_value,
        unit: params.unit.map(|u| u.trim().to_string()),
        frequency: params.frequency.as_deref().map(str::parse::<Frequency>).transpose()?.unwrap_or_default(),
        custom_days: parse_custom_days(params.custom_days.as_deref().unwrap_or_default())?,
    };
    let group_id = params.group_id.as_deref().map(parse_group_id).transpose()?;
    let habit = Habit::new(ctx.owner, group_id, params.name, params.description, config)?;

    retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let max_habits = ctx.tier.features().max_habits;
            if tx.count_habits(&ctx.owner)? >= max_habits {
                return Err(CommandError::LimitReached(format!(
                    "the {} plan allows {} habits",
                    ctx.tier.as_str(),
                    max_habits
                )));
            }
            if let Some(group_id) = &habit.group_id {
                check_group(tx, ctx, group_id)?;
            }
            tx.create_habit(&habit)?;
            Ok(())
        })
    })?;

    tracing::info!("Created habit {} ('{}') for owner {}", habit.id, habit.name, ctx.owner);

    Ok(CreateHabitResponse {
        success: true,
        habit_id: habit.id.to_string(),
        message: format!("✅ Created habit '{}'! Ready to start your streak!", habit.name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HabitGroup, HabitId, OwnerId, SubscriptionTier};
    use crate::storage::SqliteStorage;

    fn ctx(tier: SubscriptionTier) -> RequestContext {
        RequestContext::new(OwnerId::new(), tier)
    }

    fn named(name: &str) -> CreateHabitParams {
        CreateHabitParams {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_habit_defaults() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let ctx = ctx(SubscriptionTier::Free);

        let response = create_habit(&storage, &ctx, named("Drink water")).unwrap();
        let habit = storage.get_habit(&HabitId::from_string(&response.habit_id).unwrap()).unwrap();

        assert_eq!(habit.name, "Drink water");
        assert_eq!(habit.owner_id, ctx.owner);
        assert_eq!(habit.config.habit_type, HabitType::Boolean);
        assert_eq!(habit.config.frequency, Frequency::Daily);
        assert_eq!(habit.statistics().streak, 0);
    }

    #[test]
    fn test_create_custom_frequency() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let ctx = ctx(SubscriptionTier::Free);
        let params = CreateHabitParams {
            name: "Gym".to_string(),
            habit_type: Some("timer".to_string()),
            target_value: Some(45.0),
            unit: Some("minutes".to_string()),
            frequency: Some("custom".to_string()),
            custom_days: Some(vec!["mon".to_string(), "thu".to_string()]),
            ..Default::default()
        };

        let response = create_habit(&storage, &ctx, params).unwrap();
        let habit = storage.get_habit(&HabitId::from_string(&response.habit_id).unwrap()).unwrap();
        assert_eq!(habit.config.custom_days, vec![Weekday::Mon, Weekday::Thu]);
        assert_eq!(habit.target_display().as_deref(), Some("45 minutes"));
    }

    #[test]
    fn test_custom_frequency_requires_days() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let params = CreateHabitParams {
            name: "Gym".to_string(),
            frequency: Some("custom".to_string()),
            ..Default::default()
        };
        let result = create_habit(&storage, &ctx(SubscriptionTier::Free), params);
        assert!(matches!(result, Err(CommandError::Validation(_))));
    }

    #[test]
    fn test_free_tier_habit_limit() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let ctx = ctx(SubscriptionTier::Free);
        for i in 0..SubscriptionTier::Free.features().max_habits {
            create_habit(&storage, &ctx, named(&format!("Habit {}", i))).unwrap();
        }

        let result = create_habit(&storage, &ctx, named("One too many"));
        assert!(matches!(result, Err(CommandError::LimitReached(_))));
    }

    #[test]
    fn test_group_must_belong_to_requester() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let group = HabitGroup::new(OwnerId::new(), "Theirs".to_string(), None, None, 0).unwrap();
        storage.create_group(&group).unwrap();

        let params = CreateHabitParams {
            name: "Sneaky".to_string(),
            group_id: Some(group.id.to_string()),
            ..Default::default()
        };
        let result = create_habit(&storage, &ctx(SubscriptionTier::Premium), params);
        assert!(matches!(result, Err(CommandError::Authorization(_))));
    }
}
