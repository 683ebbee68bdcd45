//! # focusloop Core Library
//!
//! The interval engine behind the `focusloop` CLI: it tracks one active
//! work-or-break interval, links work to tasks, decides when a long break is
//! due, records finished intervals and summarizes them.
//!
//! ## Architecture
//!
//! - **Timer**: a pull-based state machine. There is no background clock;
//!   remaining time is computed from the start instant whenever asked.
//! - **Tasks / Session log / Settings**: plain in-memory stores, grouped into
//!   a [`Snapshot`] that is loaded and persisted as one unit.
//! - **Storage**: SQLite persistence (one transaction per operation) and
//!   TOML configuration.
//! - **Statistics**: read-only aggregation over the log for a period.
//!
//! ## Key Components
//!
//! - [`Engine`]: load -> mutate -> persist wrapper exposing every operation
//! - [`TimerController`]: the Idle/Running state machine
//! - [`Database`]: the SQLite [`Store`]
//! - [`Config`]: application configuration

pub mod clock;
pub mod engine;
pub mod error;
pub mod session_log;
pub mod settings;
pub mod snapshot;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::Engine;
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use session_log::{FinishedInterval, SessionLog};
pub use settings::{Settings, SettingsUpdate};
pub use snapshot::Snapshot;
pub use stats::{DayCount, Period, StatisticsEngine, StatisticsReport, TaskTotal};
pub use storage::{Config, Database, MemoryStore, Store};
pub use task::{StatusFilter, Task, TaskRegistry};
pub use timer::{
    ActiveInterval, BreakKind, BreakStarted, EngineState, IntervalKind, Started, Status,
    StopOutcome, TimerController, WorkStarted,
};
