/// Streak calculation over a habit's completion history
///
/// Everything in this module is a pure function of a pre-fetched snapshot:
/// the set of completed dates inside the scan window plus a tally of log
/// statuses over the whole history. The reference date is always passed in,
/// nothing here reads the clock or the database.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use chrono::{Days, NaiveDate};

use crate::domain::{DomainError, HabitLog, LogStatus};

/// How far back `current_streak` looks, inclusive of today
pub const CURRENT_STREAK_WINDOW_DAYS: u32 = 30;

/// How far back `longest_streak` looks by default, inclusive of today
pub const LONGEST_STREAK_WINDOW_DAYS: u32 = 365;

/// Dates with a completed log, restricted to the window being scanned
pub type CompletedDates = BTreeSet<NaiveDate>;

/// Window sizes used when deriving streaks
///
/// A streak can never be longer than the window it is scanned over, so the
/// current streak is capped at `current_window_days` and the longest streak
/// at `longest_window_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    current_window_days: u32,
    longest_window_days: u32,
}

impl StreakPolicy {
    /// Build a policy, rejecting windows that could break `streak <= longest_streak`
    pub fn new(current_window_days: u32, longest_window_days: u32) -> Result<Self, DomainError> {
        if current_window_days == 0 || longest_window_days == 0 {
            return Err(DomainError::InvalidPolicy(
                "Streak windows must be at least one day".to_string()
            ));
        }
        if current_window_days > longest_window_days {
            return Err(DomainError::InvalidPolicy(format!(
                "Current streak window ({} days) cannot exceed longest streak window ({} days)",
                current_window_days, longest_window_days
            )));
        }
        Ok(Self {
            current_window_days,
            longest_window_days,
        })
    }

    pub fn current_window_days(&self) -> u32 {
        self.current_window_days
    }

    pub fn longest_window_days(&self) -> u32 {
        self.longest_window_days
    }

    /// First date the calculator needs to see for a given reference date
    ///
    /// Storage fetches completed dates in `[window_start(today), today]` with a
    /// single query and hands the result to the calculator.
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        window_start(today, self.longest_window_days)
    }
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            current_window_days: CURRENT_STREAK_WINDOW_DAYS,
            longest_window_days: LONGEST_STREAK_WINDOW_DAYS,
        }
    }
}

/// Count of logs per status over a habit's entire history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTally {
    pub completed: u32,
    pub skipped: u32,
    pub partial: u32,
}

impl StatusTally {
    /// Tally a sequence of statuses
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = LogStatus>,
    {
        statuses.into_iter().fold(Self::default(), |mut tally, status| {
            match status {
                LogStatus::Completed => tally.completed += 1,
                LogStatus::Skipped => tally.skipped += 1,
                LogStatus::Partial => tally.partial += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> u32 {
        self.completed + self.skipped + self.partial
    }
}

/// Snapshot of a habit's history, fetched once per recalculation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogHistory {
    /// Completed dates inside the policy's longest window
    pub completed_dates: CompletedDates,
    /// Status counts over the unbounded history
    pub tally: StatusTally,
}

impl LogHistory {
    /// Build a snapshot from a full list of logs
    ///
    /// Used when the logs are already in memory (imports, tests). Dates
    /// outside `[policy.window_start(today), today]` are left out of the
    /// completed set, exactly as the storage query does.
    pub fn from_logs(logs: &[HabitLog], today: NaiveDate, policy: &StreakPolicy) -> Self {
        let start = policy.window_start(today);
        let completed_dates = logs
            .iter()
            .filter(|log| log.status == LogStatus::Completed)
            .map(|log| log.date)
            .filter(|date| *date >= start && *date <= today)
            .collect();

        Self {
            completed_dates,
            tally: StatusTally::from_statuses(logs.iter().map(|log| log.status)),
        }
    }
}

/// Derived statistics for a habit
///
/// These are the four cached fields stored with the habit; completion rate is
/// derived from the two totals on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitStatistics {
    /// Consecutive completed days ending today
    pub streak: u32,
    /// Longest run of completed days inside the longest-streak window
    pub longest_streak: u32,
    /// Completed logs over the whole history
    pub total_completions: u32,
    /// Skipped logs over the whole history
    pub total_skips: u32,
}

impl HabitStatistics {
    /// Derive all statistics from a history snapshot
    pub fn calculate(history: &LogHistory, today: NaiveDate, policy: &StreakPolicy) -> Self {
        let streak = current_streak_within(
            &history.completed_dates,
            today,
            policy.current_window_days(),
        );
        let longest_streak = longest_streak(
            &history.completed_dates,
            today,
            policy.longest_window_days(),
        );

        Self {
            streak,
            longest_streak,
            total_completions: history.tally.completed,
            total_skips: history.tally.skipped,
        }
    }

    pub fn completion_rate(&self) -> f64 {
        completion_rate(self.total_completions, self.total_skips)
    }
}

/// Consecutive completed days ending at `today`, looking back at most 30 days
///
/// Returns 0 when `today` itself is not completed. Dates older than the
/// window are never examined, so the result is at most
/// [`CURRENT_STREAK_WINDOW_DAYS`].
pub fn current_streak(completed_dates: &CompletedDates, today: NaiveDate) -> u32 {
    current_streak_within(completed_dates, today, CURRENT_STREAK_WINDOW_DAYS)
}

/// `current_streak` with an explicit window size
pub fn current_streak_within(
    completed_dates: &CompletedDates,
    today: NaiveDate,
    window_days: u32,
) -> u32 {
    let mut streak = 0;
    for offset in 0..window_days {
        match days_before(today, offset) {
            Some(date) if completed_dates.contains(&date) => streak += 1,
            _ => break,
        }
    }
    streak
}

/// Longest run of consecutive completed days in the trailing window
///
/// Walks backward from `today` over `window_days` days. A run still open at
/// the oldest scanned day counts too.
pub fn longest_streak(completed_dates: &CompletedDates, today: NaiveDate, window_days: u32) -> u32 {
    let mut longest = 0;
    let mut run = 0;

    for offset in 0..window_days {
        let Some(date) = days_before(today, offset) else {
            break;
        };
        if completed_dates.contains(&date) {
            run += 1;
        } else {
            longest = longest.max(run);
            run = 0;
        }
    }

    longest.max(run)
}

/// Number of completed logs in the full history
pub fn total_completions(logs: &[HabitLog]) -> u32 {
    logs.iter().filter(|log| log.status == LogStatus::Completed).count() as u32
}

/// Number of skipped logs in the full history
pub fn total_skips(logs: &[HabitLog]) -> u32 {
    logs.iter().filter(|log| log.status == LogStatus::Skipped).count() as u32
}

/// Share of logged attempts that were completed, as a percentage with two decimals
///
/// Partial logs are not attempts for this purpose. Defined as 0 when nothing
/// was completed or skipped.
pub fn completion_rate(total_completions: u32, total_skips: u32) -> f64 {
    let attempts = total_completions as u64 + total_skips as u64;
    if attempts == 0 {
        return 0.0;
    }
    round_2(total_completions as f64 / attempts as f64 * 100.0)
}

/// Round to two decimal places
pub fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First day of a window of `window_days` days ending at `today`
pub fn window_start(today: NaiveDate, window_days: u32) -> NaiveDate {
    days_before(today, window_days.saturating_sub(1)).unwrap_or(NaiveDate::MIN)
}

fn days_before(date: NaiveDate, offset: u32) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(offset as u64))
}
