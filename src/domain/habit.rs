/// Habit aggregate
///
/// A habit owns its configuration, its lifecycle flags and a cached copy of
/// its statistics. The cache is a materialized view of the log history: the
/// only way to change it is `recalculate_statistics`, which always replaces
/// all four fields from a fresh snapshot.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use crate::domain::{
    validate_numeric, DomainError, Frequency, GroupId, HabitId, HabitStatistics, HabitType,
    LogHistory, OwnerId, StreakPolicy,
};

/// How a habit is tracked and scheduled
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HabitConfig {
    pub habit_type: HabitType,
    /// Goal per day for numeric and timer habits
    pub target_value: Option<f64>,
    /// Unit for the target value (e.g., "minutes", "pages")
    pub unit: Option<String>,
    pub frequency: Frequency,
    /// Days of the week for custom frequency
    pub custom_days: Vec<Weekday>,
}

impl HabitConfig {
    /// Validate the configuration as a whole
    pub fn validate(&self) -> Result<(), DomainError> {
        self.frequency.validate(&self.custom_days)?;
        validate_numeric(self.target_value, "Target value")?;
        if self.target_value == Some(0.0) {
            return Err(DomainError::InvalidValue {
                message: "Target value must be greater than 0".to_string()
            });
        }

        if let Some(unit) = &self.unit {
            let trimmed = unit.trim();
            if trimmed.is_empty() {
                return Err(DomainError::InvalidValue {
                    message: "Unit cannot be empty if specified".to_string()
                });
            }
            if trimmed.chars().count() > 50 {
                return Err(DomainError::InvalidValue {
                    message: "Unit cannot be longer than 50 characters".to_string()
                });
            }
        }

        let mut days = self.custom_days.clone();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        if days.len() != self.custom_days.len() {
            return Err(DomainError::InvalidFrequency(
                "Custom days cannot contain duplicates".to_string()
            ));
        }

        Ok(())
    }
}

/// A habit the user wants to do (or avoid) regularly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier for this habit
    pub id: HabitId,
    /// The user this habit belongs to
    pub owner_id: OwnerId,
    /// Optional group; cleared when the group is deleted
    pub group_id: Option<GroupId>,
    /// Display name (e.g., "Morning Run", "No sugar")
    pub name: String,
    pub description: Option<String>,
    pub config: HabitConfig,
    /// False while archived
    pub is_active: bool,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    statistics: HabitStatistics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    /// Create a new habit with validation
    pub fn new(
        owner_id: OwnerId,
        group_id: Option<GroupId>,
        name: String,
        description: Option<String>,
        config: HabitConfig,
    ) -> Result<Self, DomainError> {
        Self::validate_name(&name)?;
        Self::validate_description(&description)?;
        config.validate()?;

        let now = Utc::now();
        Ok(Self {
            id: HabitId::new(),
            owner_id,
            group_id,
            name: name.trim().to_string(),
            description,
            config,
            is_active: true,
            is_archived: false,
            archived_at: None,
            statistics: HabitStatistics::default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Create a habit from existing data (used when loading from database)
    #[allow(clippy::too_many_arguments)]
    pub fn from_existing(
        id: HabitId,
        owner_id: OwnerId,
        group_id: Option<GroupId>,
        name: String,
        description: Option<String>,
        config: HabitConfig,
        is_active: bool,
        is_archived: bool,
        archived_at: Option<DateTime<Utc>>,
        statistics: HabitStatistics,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            group_id,
            name,
            description,
            config,
            is_active,
            is_archived,
            archived_at,
            statistics,
            created_at,
            updated_at,
        }
    }

    /// Cached statistics as of the last recalculation
    pub fn statistics(&self) -> &HabitStatistics {
        &self.statistics
    }

    pub fn completion_rate(&self) -> f64 {
        self.statistics.completion_rate()
    }

    pub fn is_owned_by(&self, owner_id: &OwnerId) -> bool {
        self.owner_id == *owner_id
    }

    /// Replace the cached statistics with values derived from `history`
    ///
    /// Never increments or decrements: calling this twice with the same
    /// history and reference date yields identical statistics.
    pub fn recalculate_statistics(
        &mut self,
        history: &LogHistory,
        today: NaiveDate,
        policy: &StreakPolicy,
    ) -> HabitStatistics {
        self.statistics = HabitStatistics::calculate(history, today, policy);
        self.updated_at = Utc::now();
        self.statistics
    }

    /// Archive the habit; its logs are kept
    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.is_archived = true;
        self.is_active = false;
        self.archived_at = Some(now);
        self.updated_at = now;
    }

    /// Bring an archived habit back
    pub fn unarchive(&mut self, now: DateTime<Utc>) {
        self.is_archived = false;
        self.is_active = true;
        self.archived_at = None;
        self.updated_at = now;
    }

    /// Update the habit's properties with validation
    ///
    /// Nothing is applied unless every new value is valid.
    pub fn update(
        &mut self,
        name: Option<String>,
        description: Option<Option<String>>,
        group_id: Option<Option<GroupId>>,
        config: Option<HabitConfig>,
    ) -> Result<(), DomainError> {
        if let Some(ref new_name) = name {
            Self::validate_name(new_name)?;
        }
        if let Some(ref new_desc) = description {
            Self::validate_description(new_desc)?;
        }
        if let Some(ref new_config) = config {
            new_config.validate()?;
        }

        if let Some(new_name) = name {
            self.name = new_name.trim().to_string();
        }
        if let Some(new_description) = description {
            self.description = new_description;
        }
        if let Some(new_group) = group_id {
            self.group_id = new_group;
        }
        if let Some(new_config) = config {
            self.config = new_config;
        }
        self.updated_at = Utc::now();

        Ok(())
    }

    /// Get a display string for the target (e.g., "30 minutes")
    pub fn target_display(&self) -> Option<String> {
        match (self.config.target_value, &self.config.unit) {
            (Some(value), Some(unit)) => Some(format!("{} {}", value, unit)),
            (Some(value), None) => Some(value.to_string()),
            _ => None,
        }
    }

    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string()
            ));
        }

        if trimmed.chars().count() > 200 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 200 characters".to_string()
            ));
        }

        Ok(())
    }

    fn validate_description(description: &Option<String>) -> Result<(), DomainError> {
        if let Some(desc) = description {
            if desc.chars().count() > 2000 {
                return Err(DomainError::Validation {
                    message: "Description cannot be longer than 2000 characters".to_string()
                });
            }
        }
        Ok(())
    }
}
