/// Subscription tiers and the features each one unlocks
///
/// The tier is supplied with every request; commands consult the feature
/// table before creating habits or groups, running analytics or exporting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
    Family,
}

/// Limits and switches for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFeatures {
    pub max_habits: u32,
    pub max_groups: u32,
    pub analytics: bool,
    pub export: bool,
    pub family_sharing: bool,
    pub priority_support: bool,
    pub custom_themes: bool,
}

/// A feature switch that can be checked against a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Analytics,
    Export,
    FamilySharing,
    PrioritySupport,
    CustomThemes,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::Analytics => "analytics",
            Feature::Export => "export",
            Feature::FamilySharing => "family sharing",
            Feature::PrioritySupport => "priority support",
            Feature::CustomThemes => "custom themes",
        };
        f.write_str(name)
    }
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Family => "family",
        }
    }

    /// Feature table for this tier
    pub const fn features(&self) -> TierFeatures {
        match self {
            SubscriptionTier::Free => TierFeatures {
                max_habits: 5,
                max_groups: 2,
                analytics: false,
                export: false,
                family_sharing: false,
                priority_support: false,
                custom_themes: false,
            },
            SubscriptionTier::Premium => TierFeatures {
                max_habits: 50,
                max_groups: 10,
                analytics: true,
                export: true,
                family_sharing: false,
                priority_support: false,
                custom_themes: true,
            },
            SubscriptionTier::Family => TierFeatures {
                max_habits: 200,
                max_groups: 50,
                analytics: true,
                export: true,
                family_sharing: true,
                priority_support: true,
                custom_themes: true,
            },
        }
    }

    pub fn allows(&self, feature: Feature) -> bool {
        let features = self.features();
        match feature {
            Feature::Analytics => features.analytics,
            Feature::Export => features.export,
            Feature::FamilySharing => features.family_sharing,
            Feature::PrioritySupport => features.priority_support,
            Feature::CustomThemes => features.custom_themes,
        }
    }

    /// Family is the top tier
    pub fn upgrade_available(&self) -> bool {
        *self != SubscriptionTier::Family
    }
}

impl Default for SubscriptionTier {
    fn default() -> Self {
        SubscriptionTier::Free
    }
}

impl FromStr for SubscriptionTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "premium" => Ok(SubscriptionTier::Premium),
            "family" => Ok(SubscriptionTier::Family),
            other => Err(DomainError::Validation {
                message: format!("Invalid subscription tier '{}'. Valid options: free, premium, family", other),
            }),
        }
    }
}
