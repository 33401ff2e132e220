/// Habit groups (e.g. "Morning", "Evening", "Health")

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::domain::{DomainError, GroupId, OwnerId};

const DEFAULT_COLOR: &str = "#3B82F6";

/// A named bucket of habits belonging to one owner
///
/// Deleting a group leaves its habits in place with no group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitGroup {
    pub id: GroupId,
    pub owner_id: OwnerId,
    /// Unique per owner
    pub name: String,
    pub description: Option<String>,
    /// `#RRGGBB`
    pub color: String,
    /// Sort position among the owner's groups
    pub position: u32,
    pub created_at: DateTime<Utc>,
}

impl HabitGroup {
    pub fn new(
        owner_id: OwnerId,
        name: String,
        description: Option<String>,
        color: Option<String>,
        position: u32,
    ) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation {
                message: "Group name cannot be empty".to_string(),
            });
        }
        if name.chars().count() > 100 {
            return Err(DomainError::Validation {
                message: "Group name cannot be longer than 100 characters".to_string(),
            });
        }

        let color = color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
        validate_color(&color)?;

        Ok(Self {
            id: GroupId::new(),
            owner_id,
            name,
            description: description.filter(|d| !d.trim().is_empty()),
            color,
            position,
            created_at: Utc::now(),
        })
    }
}

/// Validate a `#RRGGBB` color string
pub fn validate_color(color: &str) -> Result<(), DomainError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(DomainError::Validation {
            message: format!("Color must look like #RRGGBB, got '{}'", color),
        })
    }
}
