/// Domain module containing core business logic and data types
///
/// This module defines the core entities (Habit, HabitLog, HabitGroup), the
/// pure streak calculator and the subscription feature table. Nothing in here
/// touches storage or reads the wall clock.

pub mod habit;
pub mod log;
pub mod group;
pub mod streak;
pub mod subscription;
pub mod types;

// Re-export public types for easy access
pub use habit::*;
pub use log::*;
pub use group::*;
pub use streak::*;
pub use subscription::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Invalid streak policy: {0}")]
    InvalidPolicy(String),
}
