//! Append-only log of finished intervals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::IntervalKind;

/// Label recorded for break intervals.
pub const BREAK_LABEL: &str = "Break";

/// A finished interval. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedInterval {
    pub id: String,
    pub task_name: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub kind: IntervalKind,
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub completed: bool,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLog {
    records: Vec<FinishedInterval>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from stored records (already in insertion order).
    pub fn from_records(records: Vec<FinishedInterval>) -> Self {
        Self { records }
    }

    pub fn append(&mut self, record: FinishedInterval) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinishedInterval> {
        self.records.iter()
    }

    pub fn records(&self) -> &[FinishedInterval] {
        &self.records
    }

    /// Records that started at or after `since`, in insertion order.
    pub fn query(
        &self,
        since: DateTime<Utc>,
        completed_only: bool,
    ) -> impl Iterator<Item = &FinishedInterval> {
        self.records
            .iter()
            .filter(move |r| r.started_at >= since)
            .filter(move |r| !completed_only || r.completed)
    }

    /// Most recently appended work interval.
    pub fn last_work(&self) -> Option<&FinishedInterval> {
        self.records.iter().rev().find(|r| r.kind.is_work())
    }
}
