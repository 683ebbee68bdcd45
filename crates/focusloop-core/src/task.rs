//! Task registry.
//!
//! Tasks are keyed by id. Names may repeat; lookups by name return the
//! oldest task that is still active.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};

/// A unit of work that intervals are counted against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub estimated_intervals: u32,
    pub completed_intervals: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Task {
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }
}

/// Which tasks `list` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    Active,
    Completed,
    All,
}

impl StatusFilter {
    fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::Active => task.is_active(),
            StatusFilter::Completed => !task.is_active(),
            StatusFilter::All => true,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
            StatusFilter::All => "all",
        };
        f.write_str(s)
    }
}

impl FromStr for StatusFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            "all" => Ok(StatusFilter::All),
            other => Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: format!("expected active, completed or all, got '{other}'"),
            }),
        }
    }
}

/// Owns every task ever created, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from stored tasks (already in creation order).
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Create a new task. Duplicate names are allowed.
    pub fn add<I, S>(
        &mut self,
        name: &str,
        estimated_intervals: u32,
        tags: I,
        now: DateTime<Utc>,
    ) -> Result<&Task>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = validate_name(name)?;
        if estimated_intervals == 0 {
            return Err(ValidationError::positive("estimated_intervals").into());
        }
        let tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let task = Task {
            id: Uuid::new_v4().to_string(),
            name,
            estimated_intervals,
            completed_intervals: 0,
            created_at: now,
            completed_at: None,
            tags,
        };
        tracing::info!(task_id = %task.id, name = %task.name, "task created");
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub(crate) fn get_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// Oldest active task whose name matches exactly.
    pub fn find_active_by_name(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.is_active() && t.name == name)
    }

    /// Tasks matching `status` and, when given, carrying `tag`.
    pub fn list(&self, status: StatusFilter, tag: Option<&str>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| status.matches(t))
            .filter(|t| tag.map_or(true, |tag| t.tags.contains(tag)))
            .collect()
    }

    /// Mark a task completed. Completing twice moves `completed_at` forward.
    pub fn complete(&mut self, task_id: &str, now: DateTime<Utc>) -> Result<&Task> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| CoreError::NotFound {
                task_id: task_id.to_string(),
            })?;
        task.completed_at = Some(now);
        tracing::info!(task_id = %task.id, "task completed");
        Ok(task)
    }
}

pub(crate) fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName {
            field: "name".into(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap() + Duration::minutes(min)
    }

    #[test]
    fn add_assigns_defaults_and_dedups_tags() {
        let mut reg = TaskRegistry::new();
        let task = reg
            .add("  Write report ", 3, ["work", " work", "", "urgent"], at(0))
            .unwrap()
            .clone();
        assert_eq!(task.name, "Write report");
        assert_eq!(task.estimated_intervals, 3);
        assert_eq!(task.completed_intervals, 0);
        assert!(task.is_active());
        assert_eq!(
            task.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["urgent", "work"]
        );
    }

    #[test]
    fn add_rejects_empty_name_and_zero_estimate() {
        let mut reg = TaskRegistry::new();
        let err = reg.add("   ", 1, Vec::<String>::new(), at(0)).unwrap_err();
        assert_eq!(err.kind(), "validation");
        let err = reg.add("ok", 0, Vec::<String>::new(), at(0)).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(reg.is_empty());
    }

    #[test]
    fn duplicate_names_resolve_to_oldest_active() {
        let mut reg = TaskRegistry::new();
        let first = reg.add("X", 1, Vec::<String>::new(), at(0)).unwrap().id.clone();
        let second = reg.add("X", 1, Vec::<String>::new(), at(1)).unwrap().id.clone();
        assert_eq!(reg.find_active_by_name("X").unwrap().id, first);

        reg.complete(&first, at(2)).unwrap();
        assert_eq!(reg.find_active_by_name("X").unwrap().id, second);

        reg.complete(&second, at(3)).unwrap();
        assert!(reg.find_active_by_name("X").is_none());
    }

    #[test]
    fn list_filters_by_status_and_tag() {
        let mut reg = TaskRegistry::new();
        let a = reg.add("a", 1, ["home"], at(0)).unwrap().id.clone();
        reg.add("b", 1, ["work"], at(1)).unwrap();
        reg.add("c", 1, Vec::<String>::new(), at(2)).unwrap();
        reg.complete(&a, at(3)).unwrap();

        let names = |v: Vec<&Task>| v.into_iter().map(|t| t.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(reg.list(StatusFilter::Active, None)), vec!["b", "c"]);
        assert_eq!(names(reg.list(StatusFilter::Completed, None)), vec!["a"]);
        assert_eq!(names(reg.list(StatusFilter::All, None)), vec!["a", "b", "c"]);
        assert_eq!(names(reg.list(StatusFilter::All, Some("work"))), vec!["b"]);
        assert!(reg.list(StatusFilter::Active, Some("home")).is_empty());
    }

    #[test]
    fn complete_unknown_task_is_not_found() {
        let mut reg = TaskRegistry::new();
        let err = reg.complete("missing", at(0)).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { ref task_id } if task_id == "missing"));
    }

    #[test]
    fn recomplete_is_last_write_wins() {
        let mut reg = TaskRegistry::new();
        let id = reg.add("a", 1, Vec::<String>::new(), at(0)).unwrap().id.clone();
        reg.complete(&id, at(5)).unwrap();
        let again = reg.complete(&id, at(9)).unwrap();
        assert_eq!(again.completed_at, Some(at(9)));
    }

    #[test]
    fn status_filter_parses() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert!("done".parse::<StatusFilter>().is_err());
        assert_eq!(StatusFilter::Completed.to_string(), "completed");
    }
}
