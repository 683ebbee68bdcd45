use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl IntervalKind {
    pub fn is_work(self) -> bool {
        self == IntervalKind::Work
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntervalKind::Work => "work",
            IntervalKind::ShortBreak => "short_break",
            IntervalKind::LongBreak => "long_break",
        }
    }

    pub(crate) fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "work" => Some(IntervalKind::Work),
            "short_break" => Some(IntervalKind::ShortBreak),
            "long_break" => Some(IntervalKind::LongBreak),
            _ => None,
        }
    }
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Break length requested by `start_break`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

impl BreakKind {
    pub fn interval_kind(self) -> IntervalKind {
        match self {
            BreakKind::Short => IntervalKind::ShortBreak,
            BreakKind::Long => IntervalKind::LongBreak,
        }
    }

    pub fn duration_minutes(self, settings: &Settings) -> u32 {
        match self {
            BreakKind::Short => settings.short_break_minutes,
            BreakKind::Long => settings.long_break_minutes,
        }
    }
}

impl FromStr for BreakKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(BreakKind::Short),
            "long" => Ok(BreakKind::Long),
            other => Err(ValidationError::InvalidValue {
                field: "kind".into(),
                message: format!("expected short or long, got '{other}'"),
            }),
        }
    }
}

/// The interval currently being timed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveInterval {
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub kind: IntervalKind,
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
}

impl ActiveInterval {
    pub fn duration_secs(&self) -> i64 {
        i64::from(self.duration_minutes) * 60
    }

    /// Whole seconds elapsed since start; zero if `now` precedes the start.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.duration_secs() - self.elapsed_secs(now)).max(0)
    }
}

/// Persisted timer state.
///
/// `running` is not stored separately: it is true exactly when `active` is
/// set, which keeps the "one active interval at most" rule structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    active: Option<ActiveInterval>,
    intervals_until_long_break: u32,
}

impl EngineState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            active: None,
            intervals_until_long_break: settings.intervals_before_long_break.max(1),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveInterval> {
        self.active.as_ref()
    }

    pub fn intervals_until_long_break(&self) -> u32 {
        self.intervals_until_long_break
    }

    pub(crate) fn begin(&mut self, interval: ActiveInterval) {
        debug_assert!(self.active.is_none());
        self.active = Some(interval);
    }

    pub(crate) fn finish(&mut self) -> Option<ActiveInterval> {
        self.active.take()
    }

    /// Count one completed work interval. Returns true when the cycle wraps,
    /// i.e. a long break is due.
    pub(crate) fn count_completed_work(&mut self, cycle: u32) -> bool {
        let cycle = cycle.max(1);
        if self.intervals_until_long_break <= 1 {
            self.intervals_until_long_break = cycle;
            true
        } else {
            self.intervals_until_long_break -= 1;
            false
        }
    }

    /// Keep the counter inside `[1, cycle]` after the cycle length changes.
    pub(crate) fn clamp_to(&mut self, cycle: u32) {
        self.intervals_until_long_break = self.intervals_until_long_break.clamp(1, cycle.max(1));
    }
}

#[derive(Serialize, Deserialize)]
struct EngineStateRepr {
    running: bool,
    #[serde(default)]
    active: Option<ActiveInterval>,
    intervals_until_long_break: u32,
}

impl Serialize for EngineState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EngineStateRepr {
            running: self.active.is_some(),
            active: self.active.clone(),
            intervals_until_long_break: self.intervals_until_long_break,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EngineState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = EngineStateRepr::deserialize(deserializer)?;
        if repr.running != repr.active.is_some() {
            return Err(serde::de::Error::custom(
                "engine state: `running` disagrees with `active`",
            ));
        }
        Ok(Self {
            active: repr.active,
            intervals_until_long_break: repr.intervals_until_long_break.max(1),
        })
    }
}
