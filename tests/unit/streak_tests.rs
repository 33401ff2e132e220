/// Streak calculator tests over in-memory log histories
use chrono::{Days, NaiveDate};
use habit_streak_engine::*;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn ago(days: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(days)).unwrap()
}

fn log(habit_id: HabitId, days: u64, status: LogStatus) -> HabitLog {
    HabitLog::new(habit_id, ago(days), status, None, None).unwrap()
}

fn statistics(logs: &[HabitLog]) -> HabitStatistics {
    let policy = StreakPolicy::default();
    let history = LogHistory::from_logs(logs, today(), &policy);
    HabitStatistics::calculate(&history, today(), &policy)
}

#[cfg(test)]
mod streak_tests {
    use super::*;

    #[test]
    fn test_zero_state() {
        let stats = statistics(&[]);

        assert_eq!(stats, HabitStatistics::default());
        assert_eq!(stats.streak, 0);
        assert_eq!(stats.longest_streak, 0);
        assert_eq!(stats.total_completions, 0);
        assert_eq!(stats.total_skips, 0);
        assert_eq!(stats.completion_rate(), 0.0);
    }

    #[test]
    fn test_skip_breaks_current_streak() {
        let id = HabitId::new();
        let logs = vec![
            log(id, 0, LogStatus::Completed),
            log(id, 1, LogStatus::Completed),
            log(id, 2, LogStatus::Skipped),
        ];

        let stats = statistics(&logs);
        assert_eq!(stats.streak, 2);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.total_completions, 2);
        assert_eq!(stats.total_skips, 1);
        assert_eq!(stats.completion_rate(), 66.67);
    }

    #[test]
    fn test_longest_run_versus_current_run() {
        let id = HabitId::new();
        // Two days done, one skipped, two more done, then a gap up to today
        let logs = vec![
            log(id, 6, LogStatus::Completed),
            log(id, 5, LogStatus::Completed),
            log(id, 4, LogStatus::Skipped),
            log(id, 3, LogStatus::Completed),
            log(id, 2, LogStatus::Completed),
            log(id, 1, LogStatus::Completed),
        ];
        let stats = statistics(&logs);
        assert_eq!(stats.longest_streak, 3);
        assert_eq!(stats.streak, 0);

        let mut logs = logs;
        logs.push(log(id, 0, LogStatus::Completed));
        let stats = statistics(&logs);
        assert_eq!(stats.longest_streak, 4);
        assert_eq!(stats.streak, 4);
    }

    #[test]
    fn test_current_streak_capped_at_window() {
        let id = HabitId::new();
        let logs: Vec<HabitLog> = (0..100).map(|d| log(id, d, LogStatus::Completed)).collect();

        let stats = statistics(&logs);
        assert_eq!(stats.streak, CURRENT_STREAK_WINDOW_DAYS);
        assert_eq!(stats.longest_streak, 100);
    }

    #[test]
    fn test_longest_streak_capped_at_window() {
        let id = HabitId::new();
        let logs: Vec<HabitLog> = (0..400).map(|d| log(id, d, LogStatus::Completed)).collect();

        let stats = statistics(&logs);
        assert_eq!(stats.longest_streak, LONGEST_STREAK_WINDOW_DAYS);
        // Totals are not windowed
        assert_eq!(stats.total_completions, 400);
    }

    #[test]
    fn test_streak_never_exceeds_longest() {
        let id = HabitId::new();
        // Deterministic pseudo-random histories
        for seed in 1u64..50 {
            let logs: Vec<HabitLog> = (0..120)
                .filter_map(|d| {
                    let roll = (seed * 31 + d * 17) % 7;
                    match roll {
                        0 => Some(log(id, d, LogStatus::Skipped)),
                        1 => None,
                        2 => Some(log(id, d, LogStatus::Partial)),
                        _ => Some(log(id, d, LogStatus::Completed)),
                    }
                })
                .collect();

            let stats = statistics(&logs);
            assert!(stats.streak <= stats.longest_streak, "seed {}", seed);
            assert!(stats.streak <= CURRENT_STREAK_WINDOW_DAYS);
            assert!(stats.longest_streak <= LONGEST_STREAK_WINDOW_DAYS);
        }
    }

    #[test]
    fn test_partial_breaks_streak_and_is_not_an_attempt() {
        let id = HabitId::new();
        let logs = vec![
            log(id, 0, LogStatus::Completed),
            log(id, 1, LogStatus::Partial),
            log(id, 2, LogStatus::Completed),
        ];

        let stats = statistics(&logs);
        assert_eq!(stats.streak, 1);
        assert_eq!(stats.longest_streak, 1);
        assert_eq!(stats.completion_rate(), 100.0);
    }

    #[test]
    fn test_future_logs_do_not_count_toward_streaks() {
        let id = HabitId::new();
        let tomorrow = today().checked_add_days(Days::new(1)).unwrap();
        let logs = vec![
            HabitLog::new(id, tomorrow, LogStatus::Completed, None, None).unwrap(),
            log(id, 0, LogStatus::Completed),
        ];

        let stats = statistics(&logs);
        assert_eq!(stats.streak, 1);
        assert_eq!(stats.longest_streak, 1);
        assert_eq!(stats.total_completions, 2);
    }

    #[test]
    fn test_custom_policy_windows() {
        let id = HabitId::new();
        let logs: Vec<HabitLog> = (0..20).map(|d| log(id, d, LogStatus::Completed)).collect();
        let policy = StreakPolicy::new(7, 14).unwrap();
        let history = LogHistory::from_logs(&logs, today(), &policy);
        let stats = HabitStatistics::calculate(&history, today(), &policy);

        assert_eq!(stats.streak, 7);
        assert_eq!(stats.longest_streak, 14);
    }

    #[test]
    fn test_policy_validation() {
        assert!(StreakPolicy::new(0, 365).is_err());
        assert!(StreakPolicy::new(30, 0).is_err());
        assert!(StreakPolicy::new(60, 30).is_err());
        assert!(StreakPolicy::new(30, 30).is_ok());
    }

    #[test]
    fn test_completion_rate_rounding() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(1, 2), 33.33);
        assert_eq!(completion_rate(2, 1), 66.67);
        assert_eq!(completion_rate(5, 0), 100.0);
    }
}
