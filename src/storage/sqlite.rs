/// SQLite implementation of the habit storage interface
///
/// This module provides the concrete SQLite implementation for storing
/// and retrieving habit data. It handles all SQL queries and data conversion.

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior};
use rusqlite::types::Type;
use chrono::{DateTime, NaiveDate, Utc, Weekday};

use crate::domain::{
    CompletedDates, GroupId, Habit, HabitConfig, HabitGroup, HabitId, HabitLog, HabitStatistics,
    LogId, LogStatus, OwnerId, StatusTally, DATE_FORMAT,
};
use crate::storage::{migrations, HabitFilter, HabitStorage, StorageError};

/// How long a writer waits for a competing writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const HABIT_COLUMNS: &str = "h.id, h.owner_id, h.group_id, h.name, h.description, h.habit_type,
    h.target_value, h.unit, h.frequency, h.custom_days, h.is_active, h.is_archived, h.archived_at,
    h.streak, h.longest_streak, h.total_completions, h.total_skips, h.created_at, h.updated_at";

const LOG_COLUMNS: &str = "l.id, l.habit_id, l.date, l.status, l.value, l.notes, l.created_at, l.updated_at";

const GROUP_COLUMNS: &str = "id, owner_id, name, description, color, position, created_at";

/// SQLite-based storage implementation
///
/// This struct holds a connection to the SQLite database and implements
/// all the storage operations defined in the HabitStorage trait.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| StorageError::Connection(format!("Failed to enable WAL: {}", e)))?;
        tracing::debug!("SQLite journal mode: {}", journal_mode);

        let storage = Self::configure(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open in-memory database: {}", e)))?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StorageError::Connection(format!("Failed to set busy timeout: {}", e)))?;

        migrations::initialize_database(&conn)?;

        Ok(Self { conn })
    }

    fn query_habits(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Habit>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let habits = stmt
            .query_map(params, row_to_habit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    fn query_logs(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<HabitLog>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let logs = stmt
            .query_map(params, row_to_log)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn query_tally(&self, sql: &str, id: String) -> Result<StatusTally, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![id], |row| {
            let status: String = row.get(0)?;
            let count: u32 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut tally = StatusTally::default();
        for row in rows {
            let (status, count) = row?;
            match parse_status(&status, 0)? {
                LogStatus::Completed => tally.completed = count,
                LogStatus::Skipped => tally.skipped = count,
                LogStatus::Partial => tally.partial = count,
            }
        }
        Ok(tally)
    }
}

impl HabitStorage for SqliteStorage {
    /// Run a closure inside `BEGIN IMMEDIATE ... COMMIT`
    ///
    /// The write lock is taken up front so two commands never both read
    /// "no log yet" and then race on the insert. Returning an error (or
    /// panicking) drops the transaction, which rolls it back.
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StorageError>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(|e| E::from(write_error(e)))?;
        let value = f(self)?;
        tx.commit().map_err(|e| E::from(write_error(e)))?;
        Ok(value)
    }

    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let custom_days = serde_json::to_string(&habit.config.custom_days)?;
        let stats = habit.statistics();

        self.conn.execute(
            "INSERT INTO habits (
                id, owner_id, group_id, name, description, habit_type, target_value, unit,
                frequency, custom_days, is_active, is_archived, archived_at,
                streak, longest_streak, total_completions, total_skips, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                habit.id.to_string(),
                habit.owner_id.to_string(),
                habit.group_id.map(|g| g.to_string()),
                habit.name,
                habit.description,
                habit.config.habit_type.as_str(),
                habit.config.target_value,
                habit.config.unit,
                habit.config.frequency.as_str(),
                custom_days,
                habit.is_active,
                habit.is_archived,
                habit.archived_at.map(|t| t.to_rfc3339()),
                stats.streak,
                stats.longest_streak,
                stats.total_completions,
                stats.total_skips,
                habit.created_at.to_rfc3339(),
                habit.updated_at.to_rfc3339(),
            ],
        ).map_err(write_error)?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError> {
        let sql = format!("SELECT {} FROM habits h WHERE h.id = ?1", HABIT_COLUMNS);
        self.conn
            .query_row(&sql, params![habit_id.to_string()], row_to_habit)
            .optional()?
            .ok_or_else(|| StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            })
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let custom_days = serde_json::to_string(&habit.config.custom_days)?;

        let rows_affected = self.conn.execute(
            "UPDATE habits SET
                group_id = ?2,
                name = ?3,
                description = ?4,
                habit_type = ?5,
                target_value = ?6,
                unit = ?7,
                frequency = ?8,
                custom_days = ?9,
                is_active = ?10,
                is_archived = ?11,
                archived_at = ?12,
                updated_at = ?13
             WHERE id = ?1",
            params![
                habit.id.to_string(),
                habit.group_id.map(|g| g.to_string()),
                habit.name,
                habit.description,
                habit.config.habit_type.as_str(),
                habit.config.target_value,
                habit.config.unit,
                habit.config.frequency.as_str(),
                custom_days,
                habit.is_active,
                habit.is_archived,
                habit.archived_at.map(|t| t.to_rfc3339()),
                habit.updated_at.to_rfc3339(),
            ],
        ).map_err(write_error)?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit.id.to_string(),
            });
        }

        tracing::debug!("Updated habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "DELETE FROM habits WHERE id = ?1",
            params![habit_id.to_string()],
        ).map_err(write_error)?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }

        tracing::debug!("Deleted habit and its logs: {}", habit_id);
        Ok(())
    }

    fn list_habits(&self, owner_id: &OwnerId, filter: HabitFilter) -> Result<Vec<Habit>, StorageError> {
        let mut sql = format!(
            "SELECT {} FROM habits h LEFT JOIN habit_groups g ON g.id = h.group_id WHERE h.owner_id = ?1",
            HABIT_COLUMNS
        );
        if !filter.include_archived {
            sql.push_str(" AND h.is_archived = 0");
        }
        if filter.group_id.is_some() {
            sql.push_str(" AND h.group_id = ?2");
        }
        sql.push_str(" ORDER BY COALESCE(g.position, -1), g.name, h.name");

        let owner = owner_id.to_string();
        match filter.group_id {
            Some(group_id) => {
                let group = group_id.to_string();
                self.query_habits(&sql, params![owner, group])
            }
            None => self.query_habits(&sql, params![owner]),
        }
    }

    fn count_habits(&self, owner_id: &OwnerId) -> Result<u32, StorageError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM habits WHERE owner_id = ?1",
            params![owner_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn save_statistics(&self, habit_id: &HabitId, statistics: &HabitStatistics) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "UPDATE habits SET
                streak = ?2,
                longest_streak = ?3,
                total_completions = ?4,
                total_skips = ?5,
                updated_at = ?6
             WHERE id = ?1",
            params![
                habit_id.to_string(),
                statistics.streak,
                statistics.longest_streak,
                statistics.total_completions,
                statistics.total_skips,
                Utc::now().to_rfc3339(),
            ],
        ).map_err(write_error)?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }

        tracing::debug!("Saved statistics for habit {}: {:?}", habit_id, statistics);
        Ok(())
    }

    fn create_group(&self, group: &HabitGroup) -> Result<(), StorageError> {
        let result = self.conn.execute(
            "INSERT INTO habit_groups (id, owner_id, name, description, color, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                group.id.to_string(),
                group.owner_id.to_string(),
                group.name,
                group.description,
                group.color,
                group.position,
                group.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {
                tracing::debug!("Created group: {} ({})", group.name, group.id);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                Err(StorageError::DuplicateGroup { name: group.name.clone() })
            }
            Err(e) => Err(write_error(e)),
        }
    }

    fn get_group(&self, group_id: &GroupId) -> Result<HabitGroup, StorageError> {
        let sql = format!("SELECT {} FROM habit_groups WHERE id = ?1", GROUP_COLUMNS);
        self.conn
            .query_row(&sql, params![group_id.to_string()], row_to_group)
            .optional()?
            .ok_or_else(|| StorageError::GroupNotFound {
                group_id: group_id.to_string(),
            })
    }

    fn list_groups(&self, owner_id: &OwnerId) -> Result<Vec<HabitGroup>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habit_groups WHERE owner_id = ?1 ORDER BY position, name",
            GROUP_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let groups = stmt
            .query_map(params![owner_id.to_string()], row_to_group)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn count_groups(&self, owner_id: &OwnerId) -> Result<u32, StorageError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM habit_groups WHERE owner_id = ?1",
            params![owner_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_group(&self, group_id: &GroupId) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "DELETE FROM habit_groups WHERE id = ?1",
            params![group_id.to_string()],
        ).map_err(write_error)?;

        if rows_affected == 0 {
            return Err(StorageError::GroupNotFound {
                group_id: group_id.to_string(),
            });
        }

        tracing::debug!("Deleted group: {}", group_id);
        Ok(())
    }

    fn find_log(&self, habit_id: &HabitId, date: NaiveDate) -> Result<Option<HabitLog>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habit_logs l WHERE l.habit_id = ?1 AND l.date = ?2",
            LOG_COLUMNS
        );
        let log = self.conn
            .query_row(&sql, params![habit_id.to_string(), date_to_sql(date)], row_to_log)
            .optional()?;
        Ok(log)
    }

    /// Insert or update the single row for (habit, date)
    ///
    /// The unique index turns a racing second insert into an update of the
    /// existing row, which keeps its original id and created_at.
    fn upsert_log(&self, log: &HabitLog) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO habit_logs (id, habit_id, date, status, value, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (habit_id, date) DO UPDATE SET
                status = excluded.status,
                value = excluded.value,
                notes = excluded.notes,
                updated_at = excluded.updated_at",
            params![
                log.id.to_string(),
                log.habit_id.to_string(),
                date_to_sql(log.date),
                log.status.as_str(),
                log.value,
                log.notes,
                log.created_at.to_rfc3339(),
                log.updated_at.to_rfc3339(),
            ],
        ).map_err(write_error)?;

        tracing::debug!("Upserted {} log for habit {} on {}", log.status, log.habit_id, log.date);
        Ok(())
    }

    fn delete_log(&self, habit_id: &HabitId, date: NaiveDate) -> Result<bool, StorageError> {
        let rows_affected = self.conn.execute(
            "DELETE FROM habit_logs WHERE habit_id = ?1 AND date = ?2",
            params![habit_id.to_string(), date_to_sql(date)],
        ).map_err(write_error)?;

        tracing::debug!("Deleted {} log(s) for habit {} on {}", rows_affected, habit_id, date);
        Ok(rows_affected > 0)
    }

    fn list_logs(&self, habit_id: &HabitId, limit: Option<u32>) -> Result<Vec<HabitLog>, StorageError> {
        let mut sql = format!(
            "SELECT {} FROM habit_logs l WHERE l.habit_id = ?1 ORDER BY l.date DESC",
            LOG_COLUMNS
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        self.query_logs(&sql, params![habit_id.to_string()])
    }

    fn list_owner_logs_in_range(
        &self,
        owner_id: &OwnerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitLog>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habit_logs l JOIN habits h ON h.id = l.habit_id
             WHERE h.owner_id = ?1 AND l.date BETWEEN ?2 AND ?3
             ORDER BY l.date ASC",
            LOG_COLUMNS
        );
        self.query_logs(&sql, params![owner_id.to_string(), date_to_sql(start), date_to_sql(end)])
    }

    fn completed_dates_in_range(
        &self,
        habit_id: &HabitId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CompletedDates, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT date FROM habit_logs
             WHERE habit_id = ?1 AND status = 'completed' AND date BETWEEN ?2 AND ?3",
        )?;
        let dates = stmt
            .query_map(
                params![habit_id.to_string(), date_to_sql(start), date_to_sql(end)],
                |row| parse_date(&row.get::<_, String>(0)?, 0),
            )?
            .collect::<Result<CompletedDates, _>>()?;
        Ok(dates)
    }

    fn status_tally(&self, habit_id: &HabitId) -> Result<StatusTally, StorageError> {
        self.query_tally(
            "SELECT status, COUNT(*) FROM habit_logs WHERE habit_id = ?1 GROUP BY status",
            habit_id.to_string(),
        )
    }

    fn owner_status_tally(&self, owner_id: &OwnerId) -> Result<StatusTally, StorageError> {
        self.query_tally(
            "SELECT l.status, COUNT(*) FROM habit_logs l JOIN habits h ON h.id = l.habit_id
             WHERE h.owner_id = ?1 GROUP BY l.status",
            owner_id.to_string(),
        )
    }
}

/// Classify a failed write: lock contention and unique-key races are retryable
///
/// Other constraint failures (CHECK, FOREIGN KEY, NOT NULL) are integrity
/// errors and retrying cannot fix them.
fn write_error(e: rusqlite::Error) -> StorageError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            StorageError::Conflict(e.to_string())
        }
        _ if is_unique_violation(&e) => StorageError::Conflict(e.to_string()),
        _ => StorageError::Query(e),
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.extended_code,
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_uuid(s: &str, idx: usize) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s).map_err(|e| conversion_error(idx, e))
}

fn parse_date(s: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn parse_timestamp(s: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_status(s: &str, idx: usize) -> rusqlite::Result<LogStatus> {
    s.parse().map_err(|e| conversion_error(idx, e))
}

fn row_to_habit(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let group_id = row
        .get::<_, Option<String>>(2)?
        .map(|s| parse_uuid(&s, 2).map(GroupId))
        .transpose()?;

    let custom_days_json: String = row.get(9)?;
    let custom_days: Vec<Weekday> =
        serde_json::from_str(&custom_days_json).map_err(|e| conversion_error(9, e))?;

    let config = HabitConfig {
        habit_type: row.get::<_, String>(5)?.parse().map_err(|e| conversion_error(5, e))?,
        target_value: row.get(6)?,
        unit: row.get(7)?,
        frequency: row.get::<_, String>(8)?.parse().map_err(|e| conversion_error(8, e))?,
        custom_days,
    };

    let archived_at = row
        .get::<_, Option<String>>(12)?
        .map(|s| parse_timestamp(&s, 12))
        .transpose()?;

    let statistics = HabitStatistics {
        streak: row.get(13)?,
        longest_streak: row.get(14)?,
        total_completions: row.get(15)?,
        total_skips: row.get(16)?,
    };

    Ok(Habit::from_existing(
        HabitId(parse_uuid(&row.get::<_, String>(0)?, 0)?),
        OwnerId(parse_uuid(&row.get::<_, String>(1)?, 1)?),
        group_id,
        row.get(3)?, // name
        row.get(4)?, // description
        config,
        row.get(10)?, // is_active
        row.get(11)?, // is_archived
        archived_at,
        statistics,
        parse_timestamp(&row.get::<_, String>(17)?, 17)?,
        parse_timestamp(&row.get::<_, String>(18)?, 18)?,
    ))
}

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<HabitLog> {
    Ok(HabitLog::from_existing(
        LogId(parse_uuid(&row.get::<_, String>(0)?, 0)?),
        HabitId(parse_uuid(&row.get::<_, String>(1)?, 1)?),
        parse_date(&row.get::<_, String>(2)?, 2)?,
        parse_status(&row.get::<_, String>(3)?, 3)?,
        row.get(4)?, // value
        row.get(5)?, // notes
        parse_timestamp(&row.get::<_, String>(6)?, 6)?,
        parse_timestamp(&row.get::<_, String>(7)?, 7)?,
    ))
}

fn row_to_group(row: &Row<'_>) -> rusqlite::Result<HabitGroup> {
    Ok(HabitGroup {
        id: GroupId(parse_uuid(&row.get::<_, String>(0)?, 0)?),
        owner_id: OwnerId(parse_uuid(&row.get::<_, String>(1)?, 1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        position: row.get(5)?,
        created_at: parse_timestamp(&row.get::<_, String>(6)?, 6)?,
    })
}
