/// Per-request context handed to every command
///
/// The presentation layer builds one of these per request from the
/// authenticated identity and the clock; everything below it takes the
/// reference date from here instead of reading the wall clock itself.

use chrono::{DateTime, Local, NaiveDate, Utc};
use crate::domain::{OwnerId, StreakPolicy, SubscriptionTier};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestContext {
    /// Pre-authenticated requester
    pub owner: OwnerId,
    /// Requester's subscription tier
    pub tier: SubscriptionTier,
    /// The requester's current calendar date
    pub today: NaiveDate,
    /// Timestamp used for archived_at and similar stamps
    pub now: DateTime<Utc>,
    pub policy: StreakPolicy,
}

impl RequestContext {
    /// Context for `owner` at the current local date
    pub fn new(owner: OwnerId, tier: SubscriptionTier) -> Self {
        Self {
            owner,
            tier,
            today: Local::now().date_naive(),
            now: Utc::now(),
            policy: StreakPolicy::default(),
        }
    }

    /// Same context with a fixed reference date
    pub fn on(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_policy(mut self, policy: StreakPolicy) -> Self {
        self.policy = policy;
        self
    }
}
