/// Domain entity tests: habits, logs, groups and subscription tiers
use chrono::{NaiveDate, Utc, Weekday};
use habit_streak_engine::*;

fn daily() -> HabitConfig {
    HabitConfig::default()
}

#[cfg(test)]
mod domain_tests {
    use super::*;

    #[test]
    fn test_habit_creation() {
        let habit = Habit::new(
            OwnerId::local(),
            None,
            "  Morning Run  ".to_string(),
            Some("5k before breakfast".to_string()),
            daily(),
        )
        .expect("Failed to create habit");

        assert_eq!(habit.name, "Morning Run");
        assert!(habit.is_active);
        assert!(!habit.is_archived);
        assert_eq!(*habit.statistics(), HabitStatistics::default());
        assert!(habit.is_owned_by(&OwnerId::local()));
        assert!(!habit.is_owned_by(&OwnerId::new()));
    }

    #[test]
    fn test_habit_validation() {
        assert!(Habit::new(OwnerId::local(), None, "   ".to_string(), None, daily()).is_err());

        let custom_without_days = HabitConfig {
            frequency: Frequency::Custom,
            ..HabitConfig::default()
        };
        assert!(Habit::new(OwnerId::local(), None, "Gym".to_string(), None, custom_without_days).is_err());

        let days_without_custom = HabitConfig {
            custom_days: vec![Weekday::Mon],
            ..HabitConfig::default()
        };
        assert!(Habit::new(OwnerId::local(), None, "Gym".to_string(), None, days_without_custom).is_err());

        let negative_target = HabitConfig {
            habit_type: HabitType::Numeric,
            target_value: Some(-3.0),
            ..HabitConfig::default()
        };
        assert!(Habit::new(OwnerId::local(), None, "Read".to_string(), None, negative_target).is_err());
    }

    #[test]
    fn test_archive_round_trip() {
        let mut habit = Habit::new(OwnerId::local(), None, "Meditate".to_string(), None, daily()).unwrap();
        let now = Utc::now();

        habit.archive(now);
        assert!(habit.is_archived);
        assert!(!habit.is_active);
        assert_eq!(habit.archived_at, Some(now));

        habit.unarchive(now);
        assert!(!habit.is_archived);
        assert!(habit.is_active);
        assert_eq!(habit.archived_at, None);
    }

    #[test]
    fn test_failed_update_changes_nothing() {
        let mut habit = Habit::new(OwnerId::local(), None, "Read".to_string(), None, daily()).unwrap();
        let bad_config = HabitConfig {
            frequency: Frequency::Custom,
            ..HabitConfig::default()
        };

        let result = habit.update(Some("Read more".to_string()), None, None, Some(bad_config));
        assert!(result.is_err());
        assert_eq!(habit.name, "Read");
        assert_eq!(habit.config.frequency, Frequency::Daily);
    }

    #[test]
    fn test_target_display() {
        let config = HabitConfig {
            habit_type: HabitType::Timer,
            target_value: Some(30.0),
            unit: Some("minutes".to_string()),
            ..HabitConfig::default()
        };
        let habit = Habit::new(OwnerId::local(), None, "Practice".to_string(), None, config).unwrap();
        assert_eq!(habit.target_display(), Some("30 minutes".to_string()));
    }

    #[test]
    fn test_log_transition_keeps_identity() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut log = HabitLog::new(HabitId::new(), date, LogStatus::Skipped, None, Some("sick".to_string())).unwrap();
        let id = log.id;

        log.transition(LogStatus::Completed, Some(1.0), None).unwrap();
        assert_eq!(log.id, id);
        assert!(log.is_completed());
        assert_eq!(log.notes.as_deref(), Some("sick"));
    }

    #[test]
    fn test_log_rejects_bad_values() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(HabitLog::new(HabitId::new(), date, LogStatus::Completed, Some(f64::NAN), None).is_err());
        assert!(HabitLog::new(HabitId::new(), date, LogStatus::Completed, Some(-1.0), None).is_err());
        assert!(HabitLog::new(HabitId::new(), date, LogStatus::Completed, None, Some("x".repeat(MAX_NOTES_LEN + 1))).is_err());
    }

    #[test]
    fn test_group_validation() {
        let group = HabitGroup::new(OwnerId::local(), "Morning".to_string(), None, None, 0).unwrap();
        assert_eq!(group.color, "#3B82F6");

        assert!(HabitGroup::new(OwnerId::local(), "".to_string(), None, None, 0).is_err());
        assert!(HabitGroup::new(OwnerId::local(), "Evening".to_string(), None, Some("blue".to_string()), 0).is_err());
    }

    #[test]
    fn test_parsing() {
        assert_eq!("Completed".parse::<LogStatus>().unwrap(), LogStatus::Completed);
        assert_eq!("custom".parse::<Frequency>().unwrap(), Frequency::Custom);
        assert_eq!("negative".parse::<HabitType>().unwrap(), HabitType::Negative);
        assert_eq!("Premium".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Premium);
        assert!("gold".parse::<SubscriptionTier>().is_err());
        assert!("sometimes".parse::<Frequency>().is_err());

        assert_eq!(parse_date("2024-02-29").unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(parse_date("2023-02-29").is_err());
        assert_eq!(parse_weekday("tue").unwrap(), Weekday::Tue);
    }

    #[test]
    fn test_subscription_tiers() {
        assert!(!SubscriptionTier::Free.allows(Feature::Analytics));
        assert!(!SubscriptionTier::Free.allows(Feature::Export));
        assert!(SubscriptionTier::Premium.allows(Feature::Export));
        assert!(!SubscriptionTier::Premium.allows(Feature::FamilySharing));
        assert!(SubscriptionTier::Family.allows(Feature::FamilySharing));

        assert_eq!(SubscriptionTier::Free.features().max_habits, 5);
        assert!(SubscriptionTier::Premium.upgrade_available());
        assert!(!SubscriptionTier::Family.upgrade_available());
    }

    #[test]
    fn test_custom_frequency_schedule() {
        let days = [Weekday::Mon, Weekday::Thu];
        // 2024-01-01 was a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        assert!(Frequency::Custom.is_scheduled_for_date(monday, &days));
        assert!(!Frequency::Custom.is_scheduled_for_date(tuesday, &days));
        assert!(Frequency::Daily.is_scheduled_for_date(tuesday, &[]));
    }
}
