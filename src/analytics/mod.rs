/// Analytics engine for weekly, monthly and per-habit reports
///
/// The engine works on logs and habits that were already fetched; it never
/// touches storage and takes the reference date at construction. Only
/// completed logs count as completions.

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::Serialize;

use crate::domain::{
    completion_rate, round_2, window_start, DomainError, Habit, HabitLog, LogStatus, StatusTally,
    DATE_FORMAT,
};
use crate::tools::StatisticsSummary;

/// Days covered by the weekly report, today included
pub const WEEK_DAYS: u32 = 7;

/// Default span of a habit progress report
pub const DEFAULT_PROGRESS_DAYS: u32 = 30;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayCount {
    pub weekday: String,
    pub completed: u32,
}

/// Completions over the trailing week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStats {
    pub start_date: String,
    pub end_date: String,
    /// Monday first
    pub by_weekday: Vec<WeekdayCount>,
    pub total_completed: u32,
    pub average_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub date: String,
    pub completed: u32,
}

/// Completions per day of one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub year: i32,
    pub month: u32,
    pub days: Vec<DayCount>,
    pub total_completed: u32,
    /// Days with at least one completion
    pub active_days: u32,
    /// Percentage of the month's days that were active
    pub active_day_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyValue {
    pub date: String,
    pub status: Option<LogStatus>,
    /// Value logged for the day; skipped and missing days count as 0
    pub value: f64,
}

/// One habit's recent history next to its cached statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitProgress {
    pub habit_id: String,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub daily: Vec<DailyValue>,
    pub total_value: f64,
    pub statistics: StatisticsSummary,
    pub logged_days: u32,
    /// Percentage of days in the span with any log
    pub consistency: f64,
}

/// Totals across all of an owner's habits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerSummary {
    pub total_habits: u32,
    pub active_habits: u32,
    pub completed_logs: u32,
    pub skipped_logs: u32,
    pub partial_logs: u32,
    pub best_current_streak: u32,
    pub best_longest_streak: u32,
    pub completion_rate: f64,
}

/// Analytics engine for one reference date
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsEngine {
    today: NaiveDate,
}

impl AnalyticsEngine {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// First day of the trailing week ending today
    pub fn week_start(&self) -> NaiveDate {
        window_start(self.today, WEEK_DAYS)
    }

    /// Completed logs per weekday over the trailing seven days
    pub fn weekly(&self, logs: &[HabitLog]) -> WeeklyStats {
        let start = self.week_start();
        let mut counts = [0u32; 7];
        for log in completed_between(logs, start, self.today) {
            counts[log.date.weekday().num_days_from_monday() as usize] += 1;
        }
        let total_completed: u32 = counts.iter().sum();

        WeeklyStats {
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: self.today.format(DATE_FORMAT).to_string(),
            by_weekday: WEEKDAYS
                .iter()
                .zip(counts)
                .map(|(day, completed)| WeekdayCount {
                    weekday: day.to_string(),
                    completed,
                })
                .collect(),
            total_completed,
            average_per_day: round_2(total_completed as f64 / WEEK_DAYS as f64),
        }
    }

    /// Date range of a calendar month
    pub fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), DomainError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| DomainError::InvalidDate(format!("{}-{:02} is not a valid month", year, month)))?;
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| DomainError::InvalidDate(format!("{}-{:02} is out of range", year, month)))?;
        Ok((first, last))
    }

    /// Completed logs per day of a calendar month
    pub fn monthly(&self, year: i32, month: u32, logs: &[HabitLog]) -> Result<MonthlyStats, DomainError> {
        let (first, last) = Self::month_range(year, month)?;
        let mut days: Vec<DayCount> = first
            .iter_days()
            .take_while(|d| *d <= last)
            .map(|d| DayCount {
                date: d.format(DATE_FORMAT).to_string(),
                completed: 0,
            })
            .collect();

        for log in completed_between(logs, first, last) {
            days[log.date.day0() as usize].completed += 1;
        }

        let total_completed = days.iter().map(|d| d.completed).sum();
        let active_days = days.iter().filter(|d| d.completed > 0).count() as u32;
        let active_day_rate = round_2(active_days as f64 / days.len() as f64 * 100.0);

        Ok(MonthlyStats {
            year,
            month,
            days,
            total_completed,
            active_days,
            active_day_rate,
        })
    }

    /// Daily values for the last `span_days` days (today included)
    pub fn habit_progress(&self, habit: &Habit, logs: &[HabitLog], span_days: u32) -> HabitProgress {
        let span_days = span_days.max(1);
        let start = window_start(self.today, span_days);

        let daily: Vec<DailyValue> = start
            .iter_days()
            .take_while(|d| *d <= self.today)
            .map(|date| {
                let log = logs.iter().find(|l| l.habit_id == habit.id && l.date == date);
                DailyValue {
                    date: date.format(DATE_FORMAT).to_string(),
                    status: log.map(|l| l.status),
                    value: match log {
                        Some(l) if l.status != LogStatus::Skipped => l.value.unwrap_or(0.0),
                        _ => 0.0,
                    },
                }
            })
            .collect();

        let logged_days = daily.iter().filter(|d| d.status.is_some()).count() as u32;

        HabitProgress {
            habit_id: habit.id.to_string(),
            name: habit.name.clone(),
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: self.today.format(DATE_FORMAT).to_string(),
            total_value: round_2(daily.iter().map(|d| d.value).sum()),
            consistency: round_2(logged_days as f64 / daily.len() as f64 * 100.0),
            daily,
            statistics: (*habit.statistics()).into(),
            logged_days,
        }
    }

    /// Totals across an owner's habits
    pub fn owner_summary(&self, habits: &[Habit], tally: StatusTally) -> OwnerSummary {
        OwnerSummary {
            total_habits: habits.len() as u32,
            active_habits: habits.iter().filter(|h| !h.is_archived).count() as u32,
            completed_logs: tally.completed,
            skipped_logs: tally.skipped,
            partial_logs: tally.partial,
            best_current_streak: habits.iter().map(|h| h.statistics().streak).max().unwrap_or(0),
            best_longest_streak: habits.iter().map(|h| h.statistics().longest_streak).max().unwrap_or(0),
            completion_rate: completion_rate(tally.completed, tally.skipped),
        }
    }
}

fn completed_between(logs: &[HabitLog], start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = &HabitLog> {
    logs.iter()
        .filter(move |log| log.status == LogStatus::Completed && log.date >= start && log.date <= end)
}
