//! Interval state machine.
//!
//! The controller is pull-based: nothing expires on its own. `status()`
//! reports how much of the planned duration is left, and an interval stays
//! running (even past its planned end) until the caller issues `stop`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start_work / start_break--> Running --stop--> Idle
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{ActiveInterval, BreakKind, EngineState, IntervalKind};
use crate::error::{CoreError, Result, ValidationError};
use crate::session_log::{FinishedInterval, SessionLog, BREAK_LABEL};
use crate::settings::Settings;
use crate::task::{self, Task, TaskRegistry};

/// Label used when a work interval's task is no longer in the registry.
const MISSING_TASK_LABEL: &str = "Unknown task";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkStarted {
    pub interval_id: String,
    pub task_id: String,
    pub task_name: String,
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
    /// True when no active task had this name and one was created.
    pub task_created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakStarted {
    pub interval_id: String,
    pub kind: IntervalKind,
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
}

/// An interval started as a side effect of `stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Started {
    Work(WorkStarted),
    Break(BreakStarted),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub record: FinishedInterval,
    /// The linked task after the stop was applied.
    pub task: Option<Task>,
    pub intervals_until_long_break: u32,
    pub long_break_due: bool,
    pub auto_started: Option<Started>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    Idle {
        intervals_until_long_break: u32,
    },
    Running {
        interval_id: String,
        kind: IntervalKind,
        task_id: Option<String>,
        task_name: Option<String>,
        duration_minutes: u32,
        started_at: DateTime<Utc>,
        elapsed_seconds: i64,
        remaining_seconds: i64,
        /// Advisory only; the interval keeps running until stopped.
        expired: bool,
        intervals_until_long_break: u32,
    },
}

impl Status {
    pub fn is_running(&self) -> bool {
        matches!(self, Status::Running { .. })
    }

    pub fn remaining_seconds(&self) -> Option<i64> {
        match self {
            Status::Idle { .. } => None,
            Status::Running {
                remaining_seconds, ..
            } => Some(*remaining_seconds),
        }
    }
}

/// Read-only status; the interval keeps running past its planned end.
pub(crate) fn status_of(state: &EngineState, tasks: &TaskRegistry, now: DateTime<Utc>) -> Status {
    let until = state.intervals_until_long_break();
    let Some(active) = state.active() else {
        return Status::Idle {
            intervals_until_long_break: until,
        };
    };
    let remaining = active.remaining_secs(now);
    Status::Running {
        interval_id: active.id.clone(),
        kind: active.kind,
        task_id: active.task_id.clone(),
        task_name: active
            .task_id
            .as_deref()
            .and_then(|id| tasks.get(id))
            .map(|t| t.name.clone()),
        duration_minutes: active.duration_minutes,
        started_at: active.started_at,
        elapsed_seconds: active.elapsed_secs(now),
        remaining_seconds: remaining,
        expired: remaining == 0,
        intervals_until_long_break: until,
    }
}

/// Borrowed view over the stores the state machine touches.
pub struct TimerController<'a> {
    settings: &'a Settings,
    tasks: &'a mut TaskRegistry,
    log: &'a mut SessionLog,
    state: &'a mut EngineState,
}

impl<'a> TimerController<'a> {
    pub fn new(
        settings: &'a Settings,
        tasks: &'a mut TaskRegistry,
        log: &'a mut SessionLog,
        state: &'a mut EngineState,
    ) -> Self {
        Self {
            settings,
            tasks,
            log,
            state,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self, now: DateTime<Utc>) -> Status {
        status_of(&*self.state, &*self.tasks, now)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start_work(
        &mut self,
        task_name: &str,
        duration_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<WorkStarted> {
        self.ensure_idle()?;
        let name = task::validate_name(task_name)?;
        let duration = match duration_minutes {
            Some(0) => return Err(ValidationError::positive("duration_minutes").into()),
            Some(d) => d,
            None => self.settings.work_minutes,
        };

        let (task_id, task_created) = match self.tasks.find_active_by_name(&name) {
            Some(task) => (task.id.clone(), false),
            None => (
                self.tasks
                    .add(&name, 1, Vec::<String>::new(), now)?
                    .id
                    .clone(),
                true,
            ),
        };
        let mut started = self.begin_work(task_id, name, duration, now);
        started.task_created = task_created;
        Ok(started)
    }

    pub fn start_break(&mut self, kind: BreakKind, now: DateTime<Utc>) -> Result<BreakStarted> {
        self.ensure_idle()?;
        Ok(self.begin_break(kind, now))
    }

    /// Finish the running interval and append it to the log.
    ///
    /// Only a completed work interval advances the task counter and the
    /// long-break cycle. An interrupted interval is still logged.
    pub fn stop(&mut self, mark_completed: bool, now: DateTime<Utc>) -> Result<StopOutcome> {
        let active = self.state.finish().ok_or(CoreError::NotRunning)?;
        let counts = active.kind.is_work() && mark_completed;

        let (task_name, task) = match active.task_id.as_deref() {
            Some(id) => match self.tasks.get_mut(id) {
                Some(task) => {
                    if counts {
                        task.completed_intervals += 1;
                    }
                    (task.name.clone(), Some(task.clone()))
                }
                None => {
                    tracing::warn!(task_id = id, "linked task missing at stop");
                    (MISSING_TASK_LABEL.to_string(), None)
                }
            },
            None => (BREAK_LABEL.to_string(), None),
        };

        let long_break_due =
            counts && self.state.count_completed_work(self.settings.intervals_before_long_break);

        let record = FinishedInterval {
            id: active.id,
            task_name,
            task_id: active.task_id,
            kind: active.kind,
            duration_minutes: active.duration_minutes,
            started_at: active.started_at,
            ended_at: now,
            completed: mark_completed,
            interrupted: !mark_completed,
        };
        self.log.append(record.clone());
        tracing::info!(
            interval_id = %record.id,
            kind = %record.kind,
            completed = mark_completed,
            long_break_due,
            "interval stopped"
        );

        let auto_started = if mark_completed {
            self.auto_start(record.kind, long_break_due, now)
        } else {
            None
        };

        Ok(StopOutcome {
            record,
            task,
            intervals_until_long_break: self.state.intervals_until_long_break(),
            long_break_due,
            auto_started,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_idle(&self) -> Result<()> {
        match self.state.active() {
            Some(active) => Err(CoreError::Conflict {
                running: active.kind,
            }),
            None => Ok(()),
        }
    }

    fn begin_work(
        &mut self,
        task_id: String,
        task_name: String,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> WorkStarted {
        let interval_id = Uuid::new_v4().to_string();
        self.state.begin(ActiveInterval {
            id: interval_id.clone(),
            task_id: Some(task_id.clone()),
            kind: IntervalKind::Work,
            duration_minutes,
            started_at: now,
        });
        tracing::info!(%interval_id, %task_id, duration_minutes, "work interval started");
        WorkStarted {
            interval_id,
            task_id,
            task_name,
            duration_minutes,
            started_at: now,
            task_created: false,
        }
    }

    fn begin_break(&mut self, kind: BreakKind, now: DateTime<Utc>) -> BreakStarted {
        let interval_id = Uuid::new_v4().to_string();
        let duration_minutes = kind.duration_minutes(self.settings);
        let kind = kind.interval_kind();
        self.state.begin(ActiveInterval {
            id: interval_id.clone(),
            task_id: None,
            kind,
            duration_minutes,
            started_at: now,
        });
        tracing::info!(%interval_id, %kind, duration_minutes, "break started");
        BreakStarted {
            interval_id,
            kind,
            duration_minutes,
            started_at: now,
        }
    }

    /// Follow-up interval after a completed stop, per the auto-start flags.
    fn auto_start(
        &mut self,
        finished: IntervalKind,
        long_break_due: bool,
        now: DateTime<Utc>,
    ) -> Option<Started> {
        if finished.is_work() {
            if !self.settings.auto_start_breaks {
                return None;
            }
            let kind = if long_break_due {
                BreakKind::Long
            } else {
                BreakKind::Short
            };
            return Some(Started::Break(self.begin_break(kind, now)));
        }

        if !self.settings.auto_start_work {
            return None;
        }
        let task = self
            .log
            .last_work()
            .and_then(|r| r.task_id.as_deref())
            .and_then(|id| self.tasks.get(id))
            .filter(|t| t.is_active())?;
        let (task_id, task_name) = (task.id.clone(), task.name.clone());
        let duration = self.settings.work_minutes;
        Some(Started::Work(self.begin_work(task_id, task_name, duration, now)))
    }
}
