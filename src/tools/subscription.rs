/// Tool reporting what the requester's subscription tier includes

use serde::Serialize;

use crate::context::RequestContext;
use crate::domain::{SubscriptionTier, TierFeatures};
use crate::storage::HabitStorage;
use crate::tools::CommandError;

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription_type: SubscriptionTier,
    pub features: TierFeatures,
    pub habits_used: u32,
    pub groups_used: u32,
    pub upgrade_available: bool,
}

/// Feature table for the requester's tier plus current usage
pub fn get_subscription<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
) -> Result<SubscriptionResponse, CommandError> {
    Ok(SubscriptionResponse {
        subscription_type: ctx.tier,
        features: ctx.tier.features(),
        habits_used: storage.count_habits(&ctx.owner)?,
        groups_used: storage.count_groups(&ctx.owner)?,
        upgrade_available: ctx.tier.upgrade_available(),
    })
}
