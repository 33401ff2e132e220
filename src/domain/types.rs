/// Core types and enums used throughout the domain layer
///
/// This module defines the ID wrappers, habit type, frequency and log status
/// enums used by Habit, HabitLog and the storage layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use chrono::{NaiveDate, Weekday, Datelike};
use uuid::Uuid;

use crate::domain::DomainError;

/// Format used for calendar dates everywhere (`YYYY-MM-DD`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest magnitude a target or log value may take (ten digits, two decimals)
pub const MAX_NUMERIC_VALUE: f64 = 99_999_999.99;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new time-ordered identifier
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Parse an identifier from its string form
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a habit
    ///
    /// Wrapping the UUID keeps habit, log, group and owner ids from being
    /// swapped by accident.
    HabitId
}

uuid_id! {
    /// Unique identifier for a single habit log row
    LogId
}

uuid_id! {
    /// Unique identifier for a habit group
    GroupId
}

uuid_id! {
    /// Identity of the user that owns habits and groups
    OwnerId
}

impl OwnerId {
    /// The owner used by a single-user local installation
    pub fn local() -> Self {
        Self(Uuid::nil())
    }
}

/// What kind of tracking a habit uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HabitType {
    /// Done or not done
    Boolean,
    /// A counted quantity (pages, glasses of water)
    Numeric,
    /// A duration
    Timer,
    /// Something to avoid; a completed log means the day was clean
    Negative,
}

impl HabitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitType::Boolean => "boolean",
            HabitType::Numeric => "numeric",
            HabitType::Timer => "timer",
            HabitType::Negative => "negative",
        }
    }
}

impl Default for HabitType {
    fn default() -> Self {
        HabitType::Boolean
    }
}

impl FromStr for HabitType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "boolean" => Ok(HabitType::Boolean),
            "numeric" => Ok(HabitType::Numeric),
            "timer" => Ok(HabitType::Timer),
            "negative" => Ok(HabitType::Negative),
            other => Err(DomainError::Validation {
                message: format!(
                    "Invalid habit type '{}'. Valid options: boolean, numeric, timer, negative",
                    other
                ),
            }),
        }
    }
}

/// How often a habit should be performed
///
/// Streaks are counted in calendar days regardless of frequency; the
/// frequency is configuration the presentation layer uses for scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    /// Only on the days listed in the habit's custom-day set
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        }
    }

    /// Validate the frequency together with the custom-day set
    pub fn validate(&self, custom_days: &[Weekday]) -> Result<(), DomainError> {
        match self {
            Frequency::Custom => {
                if custom_days.is_empty() {
                    return Err(DomainError::InvalidFrequency(
                        "Custom frequency must specify at least one day".to_string()
                    ));
                }
            }
            _ => {
                if !custom_days.is_empty() {
                    return Err(DomainError::InvalidFrequency(format!(
                        "Custom days are only allowed with custom frequency, got {}",
                        self.as_str()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check if this frequency expects the habit to be done on a given date
    pub fn is_scheduled_for_date(&self, date: NaiveDate, custom_days: &[Weekday]) -> bool {
        match self {
            Frequency::Daily | Frequency::Weekly | Frequency::Monthly => true,
            Frequency::Custom => custom_days.contains(&date.weekday()),
        }
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Daily
    }
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "custom" => Ok(Frequency::Custom),
            other => Err(DomainError::InvalidFrequency(format!(
                "Invalid frequency '{}'. Valid options: daily, weekly, monthly, custom",
                other
            ))),
        }
    }
}

/// Outcome recorded for a habit on one calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Completed,
    Skipped,
    Partial,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Completed => "completed",
            LogStatus::Skipped => "skipped",
            LogStatus::Partial => "partial",
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Ok(LogStatus::Completed),
            "skipped" => Ok(LogStatus::Skipped),
            "partial" => Ok(LogStatus::Partial),
            other => Err(DomainError::Validation {
                message: format!(
                    "Invalid log status '{}'. Valid options: completed, skipped, partial",
                    other
                ),
            }),
        }
    }
}

/// Parse a weekday name ("mon", "monday", ...)
pub fn parse_weekday(s: &str) -> Result<Weekday, DomainError> {
    s.trim().parse::<Weekday>().map_err(|_| {
        DomainError::InvalidFrequency(format!("Invalid weekday '{}'", s))
    })
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(s: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| DomainError::InvalidDate(format!("'{}' is not a valid YYYY-MM-DD date", s)))
}

/// Validate an optional numeric value (log value or target)
pub fn validate_numeric(value: Option<f64>, what: &str) -> Result<(), DomainError> {
    if let Some(v) = value {
        if !v.is_finite() {
            return Err(DomainError::InvalidValue {
                message: format!("{} must be a finite number", what),
            });
        }
        if v < 0.0 {
            return Err(DomainError::InvalidValue {
                message: format!("{} cannot be negative", what),
            });
        }
        if v > MAX_NUMERIC_VALUE {
            return Err(DomainError::InvalidValue {
                message: format!("{} cannot exceed {}", what, MAX_NUMERIC_VALUE),
            });
        }
    }
    Ok(())
}
