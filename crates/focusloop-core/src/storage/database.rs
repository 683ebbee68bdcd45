//! SQLite-backed store.
//!
//! Persists:
//! - Settings (singleton row)
//! - Tasks, in creation order
//! - The finished-interval log, insert-only
//! - Engine state as JSON in the key-value table
//!
//! `save` writes all four in a single transaction. `transact` holds one
//! immediate (write-locked) transaction from read to write-back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::{data_dir, migrations, Store};
use crate::error::StorageError;
use crate::session_log::{FinishedInterval, SessionLog};
use crate::settings::Settings;
use crate::snapshot::Snapshot;
use crate::task::{Task, TaskRegistry};
use crate::timer::{EngineState, IntervalKind};

const ENGINE_STATE_KEY: &str = "engine_state";

/// How long a writer waits for another process to finish its operation.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database holding every collection the engine persists.
pub struct Database {
    conn: Connection,
    seed: Settings,
}

impl Database {
    /// Open the database at `<data_dir>/focusloop.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(data_dir()?.join("focusloop.db"))
    }

    /// Open (or create) the database at `path` and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            seed: Settings::default(),
        })
    }

    /// Settings used until the first save writes a settings row.
    pub fn with_seed_settings(mut self, seed: Settings) -> Self {
        self.seed = seed;
        self
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl Store for Database {
    fn load(&mut self) -> Result<Snapshot, StorageError> {
        let tx = self.conn.transaction()?;
        let snapshot = read_snapshot(&tx, &self.seed)?;
        tx.commit()?;
        Ok(snapshot)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        write_snapshot(&tx, snapshot, None)?;
        tx.commit()?;
        Ok(())
    }

    /// Runs `op` inside one `BEGIN IMMEDIATE` transaction, so no other
    /// connection can write between the read and the write-back.
    fn transact<T, E, F>(&mut self, op: F) -> Result<T, E>
    where
        F: FnOnce(&mut Snapshot) -> Result<T, E>,
        E: From<StorageError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;
        let mut snapshot = read_snapshot(&tx, &self.seed)?;
        let baseline = Baseline::of(&snapshot);
        let out = op(&mut snapshot)?;
        write_snapshot(&tx, &snapshot, Some(&baseline))?;
        tx.commit().map_err(StorageError::from)?;
        Ok(out)
    }
}

/// What a snapshot held when it was read, so a save writes back only changes.
struct Baseline {
    tasks: TaskRegistry,
    log_len: usize,
}

impl Baseline {
    fn of(snapshot: &Snapshot) -> Self {
        Self {
            tasks: snapshot.tasks.clone(),
            log_len: snapshot.log.len(),
        }
    }
}

fn read_snapshot(tx: &Transaction<'_>, seed: &Settings) -> Result<Snapshot, StorageError> {
    let settings = load_settings(tx)?.unwrap_or_else(|| seed.clone());
    let tasks = load_tasks(tx)?;
    let log = load_intervals(tx)?;
    let state = match kv_get(tx, ENGINE_STATE_KEY)? {
        Some(json) => {
            let mut state: EngineState =
                serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
                    table: "kv".into(),
                    message: e.to_string(),
                })?;
            state.clamp_to(settings.intervals_before_long_break);
            state
        }
        None => EngineState::new(&settings),
    };
    tracing::debug!(tasks = tasks.len(), intervals = log.len(), "snapshot loaded");
    Ok(Snapshot {
        settings,
        tasks: TaskRegistry::from_tasks(tasks),
        log: SessionLog::from_records(log),
        state,
    })
}

/// Without a baseline every task and interval is written.
fn write_snapshot(
    tx: &Transaction<'_>,
    snapshot: &Snapshot,
    baseline: Option<&Baseline>,
) -> Result<(), StorageError> {
    save_settings(tx, &snapshot.settings)?;

    let mut tasks_written = 0;
    for task in snapshot.tasks.iter() {
        if baseline.and_then(|b| b.tasks.get(&task.id)) != Some(task) {
            upsert_task(tx, task)?;
            tasks_written += 1;
        }
    }

    let appended = snapshot
        .log
        .records()
        .get(baseline.map_or(0, |b| b.log_len)..)
        .unwrap_or_default();
    for record in appended {
        append_interval(tx, record)?;
    }

    let state = serde_json::to_string(&snapshot.state).map_err(|e| StorageError::Corrupt {
        table: "kv".into(),
        message: e.to_string(),
    })?;
    kv_set(tx, ENGINE_STATE_KEY, &state)?;
    tracing::debug!(
        tasks = tasks_written,
        intervals = appended.len(),
        "snapshot saved"
    );
    Ok(())
}

// === Helper Functions ===

fn parse_datetime(table: &str, value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            table: table.into(),
            message: format!("bad timestamp '{value}': {e}"),
        })
}

fn load_settings(tx: &Transaction<'_>) -> Result<Option<Settings>, StorageError> {
    let settings = tx
        .query_row(
            "SELECT work_minutes, short_break_minutes, long_break_minutes,
                    intervals_before_long_break, auto_start_breaks, auto_start_work
             FROM settings WHERE id = 1",
            [],
            |row| {
                Ok(Settings {
                    work_minutes: row.get(0)?,
                    short_break_minutes: row.get(1)?,
                    long_break_minutes: row.get(2)?,
                    intervals_before_long_break: row.get(3)?,
                    auto_start_breaks: row.get(4)?,
                    auto_start_work: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(settings)
}

fn save_settings(tx: &Transaction<'_>, s: &Settings) -> Result<(), StorageError> {
    tx.execute(
        "INSERT INTO settings (id, work_minutes, short_break_minutes, long_break_minutes,
                               intervals_before_long_break, auto_start_breaks, auto_start_work)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            work_minutes = excluded.work_minutes,
            short_break_minutes = excluded.short_break_minutes,
            long_break_minutes = excluded.long_break_minutes,
            intervals_before_long_break = excluded.intervals_before_long_break,
            auto_start_breaks = excluded.auto_start_breaks,
            auto_start_work = excluded.auto_start_work",
        params![
            s.work_minutes,
            s.short_break_minutes,
            s.long_break_minutes,
            s.intervals_before_long_break,
            s.auto_start_breaks,
            s.auto_start_work,
        ],
    )?;
    Ok(())
}

type TaskRow = (String, String, u32, u32, String, Option<String>, String);

fn load_tasks(tx: &Transaction<'_>) -> Result<Vec<Task>, StorageError> {
    let mut stmt = tx.prepare(
        "SELECT id, name, estimated_intervals, completed_intervals, created_at, completed_at, tags
         FROM tasks ORDER BY seq",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    })?;

    let mut tasks = Vec::new();
    for row in rows {
        let (id, name, estimated, completed, created_at, completed_at, tags): TaskRow = row?;
        let tags = serde_json::from_str(&tags).map_err(|e| StorageError::Corrupt {
            table: "tasks".into(),
            message: format!("bad tags for {id}: {e}"),
        })?;
        tasks.push(Task {
            created_at: parse_datetime("tasks", &created_at)?,
            completed_at: completed_at
                .as_deref()
                .map(|s| parse_datetime("tasks", s))
                .transpose()?,
            id,
            name,
            estimated_intervals: estimated,
            completed_intervals: completed,
            tags,
        });
    }
    Ok(tasks)
}

fn upsert_task(tx: &Transaction<'_>, task: &Task) -> Result<(), StorageError> {
    let tags = serde_json::to_string(&task.tags).map_err(|e| StorageError::Corrupt {
        table: "tasks".into(),
        message: e.to_string(),
    })?;
    tx.execute(
        "INSERT INTO tasks (id, name, estimated_intervals, completed_intervals,
                            created_at, completed_at, tags)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            estimated_intervals = excluded.estimated_intervals,
            completed_intervals = excluded.completed_intervals,
            completed_at = excluded.completed_at,
            tags = excluded.tags",
        params![
            task.id,
            task.name,
            task.estimated_intervals,
            task.completed_intervals,
            task.created_at.to_rfc3339(),
            task.completed_at.map(|t| t.to_rfc3339()),
            tags,
        ],
    )?;
    Ok(())
}

type IntervalRow = (String, String, Option<String>, String, u32, String, String, bool, bool);

fn load_intervals(tx: &Transaction<'_>) -> Result<Vec<FinishedInterval>, StorageError> {
    let mut stmt = tx.prepare(
        "SELECT id, task_name, task_id, kind, duration_minutes, started_at, ended_at,
                completed, interrupted
         FROM intervals ORDER BY seq",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, task_name, task_id, kind, duration, started_at, ended_at, completed, interrupted): IntervalRow =
            row?;
        let kind = IntervalKind::from_db_value(&kind).ok_or_else(|| StorageError::Corrupt {
            table: "intervals".into(),
            message: format!("unknown interval kind '{kind}'"),
        })?;
        records.push(FinishedInterval {
            id,
            task_name,
            task_id,
            kind,
            duration_minutes: duration,
            started_at: parse_datetime("intervals", &started_at)?,
            ended_at: parse_datetime("intervals", &ended_at)?,
            completed,
            interrupted,
        });
    }
    Ok(records)
}

/// Records are immutable: an id that is already stored is left as is.
fn append_interval(tx: &Transaction<'_>, r: &FinishedInterval) -> Result<(), StorageError> {
    tx.execute(
        "INSERT OR IGNORE INTO intervals (id, task_name, task_id, kind, duration_minutes,
                                          started_at, ended_at, completed, interrupted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            r.id,
            r.task_name,
            r.task_id,
            r.kind.as_str(),
            r.duration_minutes,
            r.started_at.to_rfc3339(),
            r.ended_at.to_rfc3339(),
            r.completed,
            r.interrupted,
        ],
    )?;
    Ok(())
}

fn kv_get(tx: &Transaction<'_>, key: &str) -> Result<Option<String>, StorageError> {
    let value = tx
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        })
        .optional()?;
    Ok(value)
}

fn kv_set(tx: &Transaction<'_>, key: &str, value: &str) -> Result<(), StorageError> {
    tx.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::settings::SettingsUpdate;
    use crate::timer::BreakKind;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn fresh_database_loads_seed_settings() {
        let seed = Settings {
            work_minutes: 45,
            ..Settings::default()
        };
        let mut db = Database::open_memory().unwrap().with_seed_settings(seed.clone());
        let snap = db.load().unwrap();
        assert_eq!(snap.settings, seed);
        assert!(snap.tasks.is_empty());
        assert!(snap.log.is_empty());
        assert!(!snap.state.is_running());
    }

    #[test]
    fn snapshot_roundtrips_including_running_interval() {
        let mut db = Database::open_memory().unwrap();
        let mut snap = db.load().unwrap();
        snap.update_settings(&SettingsUpdate {
            short_break_minutes: Some(7),
            auto_start_work: Some(true),
            ..Default::default()
        })
        .unwrap();
        snap.tasks.add("Tagged", 2, ["b", "a"], t0()).unwrap();
        snap.timer().start_work("Write", None, t0()).unwrap();
        snap.timer().stop(true, t0() + Duration::minutes(25)).unwrap();
        snap.timer().start_break(BreakKind::Short, t0() + Duration::minutes(25)).unwrap();
        db.save(&snap).unwrap();

        let loaded = db.load().unwrap();
        assert_eq!(loaded, snap);
        assert!(loaded.state.is_running());
    }

    #[test]
    fn saved_intervals_are_never_rewritten() {
        let mut db = Database::open_memory().unwrap();
        let mut snap = db.load().unwrap();
        snap.timer().start_work("Write", None, t0()).unwrap();
        snap.timer().stop(true, t0() + Duration::minutes(25)).unwrap();
        db.save(&snap).unwrap();

        let mut tampered = snap.clone();
        let mut records = tampered.log.records().to_vec();
        records[0].task_name = "Rewritten".into();
        tampered.log = SessionLog::from_records(records);
        db.save(&tampered).unwrap();

        let loaded = db.load().unwrap();
        assert_eq!(loaded.log.len(), 1);
        assert_eq!(loaded.log.records()[0].task_name, "Write");
    }

    #[test]
    fn task_updates_keep_creation_order() {
        let mut db = Database::open_memory().unwrap();
        let mut snap = db.load().unwrap();
        let first = snap.tasks.add("first", 1, Vec::<String>::new(), t0()).unwrap().id.clone();
        snap.tasks.add("second", 1, Vec::<String>::new(), t0()).unwrap();
        db.save(&snap).unwrap();

        snap.tasks.complete(&first, t0()).unwrap();
        db.save(&snap).unwrap();

        let loaded = db.load().unwrap();
        let names: Vec<_> = loaded.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(loaded.tasks.get(&first).unwrap().completed_at, Some(t0()));
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let mut db = Database::open_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO tasks (id, name, estimated_intervals, created_at)
                 VALUES ('x', 'x', 1, 'yesterday')",
                [],
            )
            .unwrap();
        assert!(matches!(db.load(), Err(StorageError::Corrupt { .. })));
    }

    fn write_counts(db: &Database) -> (i64, i64) {
        let count = |table: &str| -> i64 {
            db.conn()
                .query_row("SELECT COUNT(*) FROM writes WHERE tbl = ?1", [table], |row| row.get(0))
                .unwrap()
        };
        (count("tasks"), count("intervals"))
    }

    #[test]
    fn transact_writes_back_only_changes() {
        let mut db = Database::open_memory().unwrap();
        db.transact(|snap| {
            snap.tasks.add("first", 1, Vec::<String>::new(), t0())?;
            snap.tasks.add("second", 1, Vec::<String>::new(), t0())?;
            snap.timer().start_work("first", None, t0())?;
            snap.timer().stop(true, t0() + Duration::minutes(25))
        })
        .unwrap();

        db.conn()
            .execute_batch(
                "CREATE TEMP TABLE writes (tbl TEXT);
                 CREATE TEMP TRIGGER task_writes AFTER UPDATE ON tasks
                 BEGIN INSERT INTO writes VALUES ('tasks'); END;
                 CREATE TEMP TRIGGER interval_writes BEFORE INSERT ON intervals
                 BEGIN INSERT INTO writes VALUES ('intervals'); END;",
            )
            .unwrap();

        db.transact(|snap| {
            snap.timer().start_work("first", None, t0() + Duration::minutes(30))?;
            snap.timer().stop(true, t0() + Duration::minutes(55))
        })
        .unwrap();

        assert_eq!(write_counts(&db), (1, 1));
        let loaded = db.load().unwrap();
        assert_eq!(loaded.log.len(), 2);
        assert_eq!(loaded.tasks.find_active_by_name("first").unwrap().completed_intervals, 2);
    }

    #[test]
    fn failed_transact_rolls_back() {
        let mut db = Database::open_memory().unwrap();
        let err = db
            .transact(|snap| {
                snap.tasks.add("kept in memory only", 1, Vec::<String>::new(), t0())?;
                snap.timer().stop(true, t0()).map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NotRunning));
        assert!(db.load().unwrap().tasks.is_empty());
    }

    #[test]
    fn second_handle_waits_for_running_operation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusloop.db");
        let mut a = Database::open(&path).unwrap();
        let mut b = Database::open(&path).unwrap();
        b.conn().busy_timeout(std::time::Duration::ZERO).unwrap();

        a.transact(|snap| snap.timer().start_work("Write", None, t0()).map(|_| ()))
            .unwrap();

        a.transact(|snap| {
            snap.timer().stop(true, t0() + Duration::minutes(25))?;
            let blocked = b.transact(|other| {
                other.tasks.add("Other", 1, Vec::<String>::new(), t0())?;
                Ok::<_, CoreError>(())
            });
            assert!(matches!(
                blocked,
                Err(CoreError::Persistence(StorageError::Locked))
            ));
            Ok::<_, CoreError>(())
        })
        .unwrap();

        b.transact(|other| {
            other.tasks.add("Other", 1, Vec::<String>::new(), t0())?;
            Ok::<_, CoreError>(())
        })
        .unwrap();

        let snap = a.load().unwrap();
        assert_eq!(snap.log.len(), 1);
        assert_eq!(snap.tasks.len(), 2);
        assert_eq!(snap.tasks.find_active_by_name("Write").unwrap().completed_intervals, 1);
        assert!(!snap.state.is_running());
        assert_eq!(snap.state.intervals_until_long_break(), 3);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("focusloop.db");
        let mut db = Database::open(&path).unwrap();
        db.save(&Snapshot::default()).unwrap();
        assert!(path.exists());
    }
}
