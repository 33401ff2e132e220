/// Tools for managing habit groups

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::domain::{HabitGroup, OwnerId};
use crate::storage::{HabitFilter, HabitStorage};
use crate::tools::{parse_group_id, retry_on_conflict, CommandError};

/// Parameters for creating a group
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CreateGroupParams {
    /// Group name, unique per owner
    pub name: String,
    pub description: Option<String>,
    /// Color as #RRGGBB
    pub color: Option<String>,
    /// Sort position; appended after existing groups when omitted
    pub position: Option<u32>,
}

/// Parameters naming a single group
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GroupRefParams {
    /// ID of the group
    pub group_id: String,
}

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub group_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub position: u32,
    pub habit_count: u32,
}

#[derive(Debug, Serialize)]
pub struct CreateGroupResponse {
    pub success: bool,
    pub group_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListGroupsResponse {
    pub groups: Vec<GroupSummary>,
}

#[derive(Debug, Serialize)]
pub struct DeleteGroupResponse {
    pub success: bool,
    /// Habits left without a group
    pub ungrouped_habits: u32,
    pub message: String,
}

/// Create a group for the requester, within the tier's group limit
pub fn create_group<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: CreateGroupParams,
) -> Result<CreateGroupResponse, CommandError> {
    let group = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let max_groups = ctx.tier.features().max_groups;
            let existing = tx.count_groups(&ctx.owner)?;
            if existing >= max_groups {
                return Err(CommandError::LimitReached(format!(
                    "the {} plan allows {} groups",
                    ctx.tier.as_str(),
                    max_groups
                )));
            }

            let group = HabitGroup::new(
                ctx.owner,
                params.name.clone(),
                params.description.clone(),
                params.color.clone(),
                params.position.unwrap_or(existing),
            )?;
            tx.create_group(&group)?;
            Ok(group)
        })
    })?;

    tracing::info!("Created group {} ('{}') for owner {}", group.id, group.name, ctx.owner);

    Ok(CreateGroupResponse {
        success: true,
        group_id: group.id.to_string(),
        message: format!("📁 Created group '{}'", group.name),
    })
}

/// List the requester's groups in position order
pub fn list_groups<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
) -> Result<ListGroupsResponse, CommandError> {
    let groups = storage.list_groups(&ctx.owner)?;
    let mut summaries = Vec::with_capacity(groups.len());
    for group in groups {
        let habit_count = habits_in_group(storage, &ctx.owner, &group)?;
        summaries.push(GroupSummary {
            group_id: group.id.to_string(),
            name: group.name,
            description: group.description,
            color: group.color,
            position: group.position,
            habit_count,
        });
    }
    Ok(ListGroupsResponse { groups: summaries })
}

/// Delete a group; its habits stay, with no group
pub fn delete_group<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: GroupRefParams,
) -> Result<DeleteGroupResponse, CommandError> {
    let group_id = parse_group_id(&params.group_id)?;

    let (group, ungrouped_habits) = retry_on_conflict(|| {
        storage.with_transaction(|tx| {
            let group = tx.get_group(&group_id)?;
            if group.owner_id != ctx.owner {
                tracing::warn!("Owner {} tried to delete group {} owned by someone else", ctx.owner, group_id);
                return Err(CommandError::Authorization(format!("group {}", group_id)));
            }
            let count = habits_in_group(tx, &ctx.owner, &group)?;
            tx.delete_group(&group_id)?;
            Ok((group, count))
        })
    })?;

    tracing::info!("Deleted group {} ({} habits ungrouped)", group_id, ungrouped_habits);

    Ok(DeleteGroupResponse {
        success: true,
        ungrouped_habits,
        message: format!("🗑️ Deleted group '{}'", group.name),
    })
}

fn habits_in_group<S: HabitStorage>(storage: &S, owner: &OwnerId, group: &HabitGroup) -> Result<u32, CommandError> {
    let filter = HabitFilter {
        group_id: Some(group.id),
        include_archived: true,
    };
    Ok(storage.list_habits(owner, filter)?.len() as u32)
}
