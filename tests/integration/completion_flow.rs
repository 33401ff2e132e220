/// Completion, recalculation and export flows through the command layer
use chrono::{Days, NaiveDate};
use habit_streak_engine::tools::*;
use habit_streak_engine::*;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn ago(days: u64) -> String {
    today().checked_sub_days(Days::new(days)).unwrap().format("%Y-%m-%d").to_string()
}

fn setup(tier: SubscriptionTier) -> (TempDir, SqliteStorage, RequestContext) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::new(dir.path().join("habits.db")).expect("Failed to create storage");
    let ctx = RequestContext::new(OwnerId::new(), tier).on(today());
    (dir, storage, ctx)
}

fn new_habit(storage: &SqliteStorage, ctx: &RequestContext, name: &str) -> String {
    let params = CreateHabitParams {
        name: name.to_string(),
        ..CreateHabitParams::default()
    };
    create_habit(storage, ctx, params).expect("Failed to create habit").habit_id
}

fn mark(storage: &SqliteStorage, ctx: &RequestContext, habit_id: &str, date: String) -> MarkCompleteResponse {
    let params = MarkCompleteParams {
        habit_id: habit_id.to_string(),
        date: Some(date),
        value: None,
        notes: None,
    };
    mark_complete(storage, ctx, params).expect("mark_complete failed")
}

fn unmark(storage: &SqliteStorage, ctx: &RequestContext, habit_id: &str, date: String) -> UnmarkCompleteResponse {
    let params = UnmarkCompleteParams {
        habit_id: habit_id.to_string(),
        date: Some(date),
    };
    unmark_complete(storage, ctx, params).expect("unmark_complete failed")
}

fn log(storage: &SqliteStorage, ctx: &RequestContext, habit_id: &str, status: &str, date: String) {
    let params = LogHabitParams {
        habit_id: habit_id.to_string(),
        status: status.to_string(),
        date: Some(date),
        value: None,
        notes: None,
    };
    log_habit(storage, ctx, params).expect("log_habit failed");
}

fn recalculate(storage: &SqliteStorage, ctx: &RequestContext, habit_id: &str) -> StatisticsSummary {
    let params = RecalculateParams { habit_id: Some(habit_id.to_string()) };
    let response = recalculate_statistics(storage, ctx, params).expect("recalculate failed");
    response.habits[0].statistics
}

#[cfg(test)]
mod completion_flow_tests {
    use super::*;

    #[test]
    fn test_streak_after_skip() {
        let (_dir, storage, ctx) = setup(SubscriptionTier::Free);
        let habit_id = new_habit(&storage, &ctx, "Read");

        mark(&storage, &ctx, &habit_id, ago(0));
        mark(&storage, &ctx, &habit_id, ago(1));
        log(&storage, &ctx, &habit_id, "skipped", ago(2));

        let stats = recalculate(&storage, &ctx, &habit_id);
        assert_eq!(stats.streak, 2);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.total_completions, 2);
        assert_eq!(stats.total_skips, 1);
    }

    #[test]
    fn test_recalculation_is_idempotent() {
        let (_dir, storage, ctx) = setup(SubscriptionTier::Free);
        let habit_id = new_habit(&storage, &ctx, "Stretch");

        for days in [0, 1, 2, 4, 5, 9] {
            mark(&storage, &ctx, &habit_id, ago(days));
        }
        log(&storage, &ctx, &habit_id, "skipped", ago(3));

        let first = recalculate(&storage, &ctx, &habit_id);
        let second = recalculate(&storage, &ctx, &habit_id);
        assert_eq!(first, second);
        assert_eq!(first.streak, 3);
        assert!(first.streak <= first.longest_streak);
    }

    #[test]
    fn test_at_most_one_log_per_date() {
        let (_dir, storage, ctx) = setup(SubscriptionTier::Free);
        let habit_id = new_habit(&storage, &ctx, "Journal");
        let id = HabitId::from_string(&habit_id).unwrap();

        mark(&storage, &ctx, &habit_id, ago(0));
        mark(&storage, &ctx, &habit_id, ago(0));
        unmark(&storage, &ctx, &habit_id, ago(0));
        unmark(&storage, &ctx, &habit_id, ago(0));
        log(&storage, &ctx, &habit_id, "skipped", ago(0));
        mark(&storage, &ctx, &habit_id, ago(0));
        log(&storage, &ctx, &habit_id, "partial", ago(0));
        mark(&storage, &ctx, &habit_id, ago(0));

        let logs = storage.list_logs(&id, None).unwrap();
        let for_today: Vec<_> = logs.iter().filter(|l| l.date == today()).collect();
        assert_eq!(for_today.len(), 1);
        assert_eq!(for_today[0].status, LogStatus::Completed);

        let stats = recalculate(&storage, &ctx, &habit_id);
        assert_eq!(stats.total_completions, 1);
        assert_eq!(stats.total_skips, 0);
    }

    #[test]
    fn test_mark_complete_over_skip() {
        let (_dir, storage, ctx) = setup(SubscriptionTier::Free);
        let habit_id = new_habit(&storage, &ctx, "Walk");
        let id = HabitId::from_string(&habit_id).unwrap();

        log(&storage, &ctx, &habit_id, "skipped", ago(1));
        mark(&storage, &ctx, &habit_id, ago(2));
        let before = recalculate(&storage, &ctx, &habit_id);
        assert_eq!(before.total_completions, 1);
        assert_eq!(before.total_skips, 1);

        let response = mark(&storage, &ctx, &habit_id, ago(1));
        assert_eq!(response.outcome, MarkOutcome::Transitioned { previous: LogStatus::Skipped });
        assert_eq!(response.statistics.total_completions, before.total_completions + 1);
        assert_eq!(response.statistics.total_skips, before.total_skips - 1);
        assert_eq!(storage.list_logs(&id, None).unwrap().len(), 2);

        let again = mark(&storage, &ctx, &habit_id, ago(1));
        assert!(again.already_completed);
        assert_eq!(again.statistics, response.statistics);
        assert_eq!(storage.list_logs(&id, None).unwrap().len(), 2);
    }

    #[test]
    fn test_unmark_without_completion_is_informational() {
        let (_dir, storage, ctx) = setup(SubscriptionTier::Free);
        let habit_id = new_habit(&storage, &ctx, "Floss");

        let response = unmark(&storage, &ctx, &habit_id, ago(0));
        assert!(response.success);
        assert!(response.was_not_completed);
        assert_eq!(response.outcome, UnmarkOutcome::NotCompleted);
        assert_eq!(response.statistics.total_completions, 0);
    }

    #[test]
    fn test_statistics_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("habits.db");
        let ctx = RequestContext::new(OwnerId::new(), SubscriptionTier::Free).on(today());

        let habit_id = {
            let storage = SqliteStorage::new(path.clone()).unwrap();
            let habit_id = new_habit(&storage, &ctx, "Water");
            mark(&storage, &ctx, &habit_id, ago(0));
            mark(&storage, &ctx, &habit_id, ago(1));
            habit_id
        };

        let storage = SqliteStorage::new(path).unwrap();
        let habit = storage.get_habit(&HabitId::from_string(&habit_id).unwrap()).unwrap();
        assert_eq!(habit.statistics().streak, 2);
        assert_eq!(habit.statistics().total_completions, 2);
    }

    #[test]
    fn test_export_import_round_trip() {
        let (_dir, storage, ctx) = setup(SubscriptionTier::Premium);
        let habit_id = new_habit(&storage, &ctx, "Guitar");

        for days in [0, 1, 2, 5, 6, 7, 8, 40] {
            mark(&storage, &ctx, &habit_id, ago(days));
        }
        log(&storage, &ctx, &habit_id, "skipped", ago(3));
        log(&storage, &ctx, &habit_id, "partial", ago(4));
        let original = recalculate(&storage, &ctx, &habit_id);

        let exported = export_habit(&storage, &ctx, HabitRefParams { habit_id: habit_id.clone() }).unwrap();
        let document = serde_json::to_value(&exported.export).unwrap();
        let imported = import_habit(&storage, &ctx, ImportHabitParams { export: document }).unwrap();

        assert_ne!(imported.habit_id, habit_id);
        assert_eq!(imported.imported_logs, 10);
        assert_eq!(imported.statistics, original);
        assert_eq!(recalculate(&storage, &ctx, &imported.habit_id), original);
    }

    #[test]
    fn test_other_owner_cannot_touch_habit() {
        let (_dir, storage, ctx) = setup(SubscriptionTier::Free);
        let habit_id = new_habit(&storage, &ctx, "Private");
        let intruder = RequestContext::new(OwnerId::new(), SubscriptionTier::Free).on(today());

        let params = MarkCompleteParams {
            habit_id: habit_id.clone(),
            date: None,
            value: None,
            notes: None,
        };
        let result = mark_complete(&storage, &intruder, params);
        assert!(matches!(result, Err(CommandError::Authorization(_))));

        let stats = recalculate(&storage, &ctx, &habit_id);
        assert_eq!(stats.total_completions, 0);
    }

    #[test]
    fn test_concurrent_writers_on_one_date() {
        const WRITERS: usize = 8;
        const ROUNDS: usize = 20;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("habits.db");
        let ctx = RequestContext::new(OwnerId::new(), SubscriptionTier::Free).on(today());
        let habit_id = {
            let storage = SqliteStorage::new(path.clone()).unwrap();
            new_habit(&storage, &ctx, "Shared")
        };

        // Every writer opens its own connection to the same file
        let failures: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..WRITERS)
                .map(|_| {
                    let path = path.clone();
                    let habit_id = habit_id.clone();
                    scope.spawn(move || {
                        let storage = SqliteStorage::new(path).expect("Failed to open storage");
                        let mut failures = Vec::new();
                        for _ in 0..ROUNDS {
                            let marked = mark_complete(&storage, &ctx, MarkCompleteParams {
                                habit_id: habit_id.clone(),
                                date: Some(ago(0)),
                                value: None,
                                notes: None,
                            });
                            if let Err(e) = marked {
                                failures.push(e.to_string());
                            }
                            let unmarked = unmark_complete(&storage, &ctx, UnmarkCompleteParams {
                                habit_id: habit_id.clone(),
                                date: Some(ago(0)),
                            });
                            if let Err(e) = unmarked {
                                failures.push(e.to_string());
                            }
                        }
                        // Finish on a completion so the final state is known
                        if let Err(e) = mark_complete(&storage, &ctx, MarkCompleteParams {
                            habit_id: habit_id.clone(),
                            date: Some(ago(0)),
                            value: None,
                            notes: None,
                        }) {
                            failures.push(e.to_string());
                        }
                        failures
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().expect("writer panicked"))
                .collect()
        });
        assert!(failures.is_empty(), "writers failed: {:?}", failures);

        let storage = SqliteStorage::new(path).unwrap();
        let id = HabitId::from_string(&habit_id).unwrap();
        let logs = storage.list_logs(&id, None).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Completed);

        let habit = storage.get_habit(&id).unwrap();
        assert_eq!(habit.statistics().total_completions, 1);
        assert_eq!(habit.statistics().streak, 1);
        assert_eq!(recalculate(&storage, &ctx, &habit_id).total_completions, 1);
    }
}
