//! Request-facing engine.
//!
//! Every operation runs load -> mutate -> persist through [`Store::transact`]
//! while holding a single lock, so concurrent callers sharing an
//! `Arc<Engine<_>>` are serialized and never observe a half-applied change.
//! [`Database`](crate::Database) extends that to other processes sharing the file.
//! Nothing is cached between calls: the snapshot is reloaded each time.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result};
use crate::settings::{Settings, SettingsUpdate};
use crate::snapshot::Snapshot;
use crate::stats::{Period, StatisticsReport};
use crate::storage::Store;
use crate::task::{StatusFilter, Task};
use crate::timer::{BreakKind, BreakStarted, Status, StopOutcome, WorkStarted};

pub struct Engine<S: Store> {
    store: Mutex<S>,
    clock: Box<dyn Clock>,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }

    pub fn with_clock(store: S, clock: impl Clock + 'static) -> Self {
        Self {
            store: Mutex::new(store),
            clock: Box::new(clock),
        }
    }

    pub fn into_store(self) -> S {
        self.store.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load, apply `op`, and persist only if `op` succeeded.
    fn transact<T>(
        &self,
        name: &'static str,
        op: impl FnOnce(&mut Snapshot, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let _span = tracing::debug_span!("engine", op = name).entered();
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        store.transact(|snapshot| op(snapshot, now)).inspect_err(|e| {
            if let CoreError::Persistence(source) = e {
                tracing::error!(error = %source, "failed to persist snapshot");
            }
        })
    }

    fn read<T>(&self, name: &'static str, op: impl FnOnce(&Snapshot, DateTime<Utc>) -> T) -> Result<T> {
        let _span = tracing::debug_span!("engine", op = name).entered();
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = store.load()?;
        Ok(op(&snapshot, self.clock.now()))
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn start_work(&self, task_name: &str, duration_minutes: Option<u32>) -> Result<WorkStarted> {
        self.transact("start_work", |snap, now| {
            snap.timer().start_work(task_name, duration_minutes, now)
        })
    }

    pub fn start_break(&self, kind: BreakKind) -> Result<BreakStarted> {
        self.transact("start_break", |snap, now| snap.timer().start_break(kind, now))
    }

    pub fn stop(&self, mark_completed: bool) -> Result<StopOutcome> {
        self.transact("stop", |snap, now| snap.timer().stop(mark_completed, now))
    }

    /// Never mutates; the only failure is an unreadable store.
    pub fn status(&self) -> Result<Status> {
        self.read("status", |snap, now| snap.status(now))
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn add_task(
        &self,
        name: &str,
        estimated_intervals: Option<u32>,
        tags: &[String],
    ) -> Result<Task> {
        self.transact("add_task", |snap, now| {
            snap.tasks
                .add(name, estimated_intervals.unwrap_or(1), tags, now)
                .cloned()
        })
    }

    pub fn list_tasks(&self, status: StatusFilter, tag: Option<&str>) -> Result<Vec<Task>> {
        self.read("list_tasks", |snap, _| {
            snap.tasks.list(status, tag).into_iter().cloned().collect()
        })
    }

    pub fn complete_task(&self, task_id: &str) -> Result<Task> {
        self.transact("complete_task", |snap, now| {
            snap.tasks.complete(task_id, now).cloned()
        })
    }

    // ── Statistics ───────────────────────────────────────────────────

    /// Statistics with calendar days in the local timezone.
    pub fn get_statistics(&self, period: Period) -> Result<StatisticsReport> {
        self.statistics_in(period, &Local)
    }

    pub fn statistics_in<Tz: TimeZone>(&self, period: Period, tz: &Tz) -> Result<StatisticsReport> {
        self.read("get_statistics", |snap, now| snap.stats().summarize(period, now, tz))
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn settings(&self) -> Result<Settings> {
        self.read("settings", |snap, _| snap.settings.clone())
    }

    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings> {
        self.transact("update_settings", |snap, _| {
            let settings = snap.update_settings(update)?.clone();
            tracing::info!(?settings, "settings updated");
            Ok(settings)
        })
    }
}
