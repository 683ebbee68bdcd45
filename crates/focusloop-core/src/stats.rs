//! Time-windowed statistics over the session log.
//!
//! Calendar boundaries ("today", the day an interval belongs to) are taken
//! in the caller-supplied timezone. The engine passes `chrono::Local`; tests
//! pin a fixed offset.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::session_log::SessionLog;
use crate::task::TaskRegistry;

/// Reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Today,
    Week,
    Month,
    All,
}

impl Period {
    /// Start of the window ending at `now`.
    pub fn since<Tz: TimeZone>(self, now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
        match self {
            Period::Today => start_of_day(now, tz),
            Period::Week => now - Duration::days(7),
            Period::Month => now - Duration::days(30),
            Period::All => DateTime::<Utc>::from(std::time::UNIX_EPOCH),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Today => "today",
            Period::Week => "week",
            Period::Month => "month",
            Period::All => "all",
        };
        f.write_str(s)
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "all" => Ok(Period::All),
            other => Err(ValidationError::InvalidValue {
                field: "period".into(),
                message: format!("expected today, week, month or all, got '{other}'"),
            }),
        }
    }
}

/// Local midnight of the day containing `now`.
///
/// Where midnight does not exist (a DST jump at 00:00) the first valid
/// instant of that day is used.
fn start_of_day<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let day = now.with_timezone(tz).date_naive();
    (0..24)
        .filter_map(|h| day.and_hms_opt(h, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub intervals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTotal {
    pub task_name: String,
    pub intervals: u32,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub period: Period,
    pub since: DateTime<Utc>,
    pub total_intervals: u32,
    pub total_minutes: u64,
    pub average_minutes: f64,
    pub completed_tasks: u32,
    /// Busiest local day; ties go to the earliest date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_productive_day: Option<DayCount>,
    pub interrupted_intervals: u32,
    pub break_minutes: u64,
    pub by_task: Vec<TaskTotal>,
}

/// Read-only aggregator over the task registry and session log.
pub struct StatisticsEngine<'a> {
    tasks: &'a TaskRegistry,
    log: &'a SessionLog,
}

impl<'a> StatisticsEngine<'a> {
    pub fn new(tasks: &'a TaskRegistry, log: &'a SessionLog) -> Self {
        Self { tasks, log }
    }

    pub fn summarize<Tz: TimeZone>(
        &self,
        period: Period,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> StatisticsReport {
        let since = period.since(now, tz);
        let work: Vec<_> = self
            .log
            .query(since, true)
            .filter(|r| r.kind.is_work())
            .collect();

        let total_intervals = work.len() as u32;
        let total_minutes: u64 = work.iter().map(|r| u64::from(r.duration_minutes)).sum();
        let average_minutes = if total_intervals > 0 {
            total_minutes as f64 / f64::from(total_intervals)
        } else {
            0.0
        };

        let completed_tasks = self
            .tasks
            .iter()
            .filter(|t| t.completed_at.is_some_and(|at| at >= since))
            .count() as u32;

        let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for r in &work {
            *per_day
                .entry(r.started_at.with_timezone(tz).date_naive())
                .or_default() += 1;
        }
        // Dates iterate ascending; keeping the incumbent on ties picks the earliest.
        let most_productive_day = per_day
            .into_iter()
            .fold(None::<DayCount>, |best, (date, intervals)| match best {
                Some(b) if b.intervals >= intervals => Some(b),
                _ => Some(DayCount { date, intervals }),
            });

        let mut per_task: HashMap<&str, TaskTotal> = HashMap::new();
        for r in &work {
            let entry = per_task.entry(r.task_name.as_str()).or_insert_with(|| TaskTotal {
                task_name: r.task_name.clone(),
                intervals: 0,
                minutes: 0,
            });
            entry.intervals += 1;
            entry.minutes += u64::from(r.duration_minutes);
        }
        let mut by_task: Vec<TaskTotal> = per_task.into_values().collect();
        by_task.sort_by(|a, b| {
            b.minutes
                .cmp(&a.minutes)
                .then_with(|| a.task_name.cmp(&b.task_name))
        });

        let mut interrupted_intervals = 0;
        let mut break_minutes = 0;
        for r in self.log.query(since, false) {
            if r.kind.is_work() {
                if r.interrupted {
                    interrupted_intervals += 1;
                }
            } else if r.completed {
                break_minutes += u64::from(r.duration_minutes);
            }
        }

        StatisticsReport {
            period,
            since,
            total_intervals,
            total_minutes,
            average_minutes,
            completed_tasks,
            most_productive_day,
            interrupted_intervals,
            break_minutes,
            by_task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_log::{FinishedInterval, BREAK_LABEL};
    use crate::timer::IntervalKind;
    use chrono::FixedOffset;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    /// Local (UTC+2) wall-clock instant.
    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        tz().with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn work(name: &str, start: DateTime<Utc>, minutes: u32, completed: bool) -> FinishedInterval {
        FinishedInterval {
            id: format!("{name}-{}", start.timestamp()),
            task_name: name.into(),
            task_id: None,
            kind: IntervalKind::Work,
            duration_minutes: minutes,
            started_at: start,
            ended_at: start + Duration::minutes(i64::from(minutes)),
            completed,
            interrupted: !completed,
        }
    }

    fn short_break(start: DateTime<Utc>) -> FinishedInterval {
        FinishedInterval {
            kind: IntervalKind::ShortBreak,
            task_name: BREAK_LABEL.into(),
            ..work(BREAK_LABEL, start, 5, true)
        }
    }

    #[test]
    fn empty_log_has_zero_average_and_no_best_day() {
        let tasks = TaskRegistry::new();
        let log = SessionLog::new();
        let report = StatisticsEngine::new(&tasks, &log).summarize(Period::All, local(2025, 3, 10, 9), &tz());
        assert_eq!(report.total_intervals, 0);
        assert_eq!(report.total_minutes, 0);
        assert_eq!(report.average_minutes, 0.0);
        assert!(report.most_productive_day.is_none());
        assert!(report.by_task.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("most_productive_day").is_none());
    }

    #[test]
    fn today_starts_at_local_midnight() {
        let now = local(2025, 3, 10, 1);
        assert_eq!(Period::Today.since(now, &tz()), local(2025, 3, 10, 0));
        assert_eq!(Period::Week.since(now, &tz()), now - Duration::days(7));
        assert_eq!(Period::Month.since(now, &tz()), now - Duration::days(30));
        assert_eq!(Period::All.since(now, &tz()).timestamp(), 0);
    }

    #[test]
    fn summarize_counts_completed_work_in_window() {
        let mut log = SessionLog::new();
        log.append(work("Old", local(2025, 3, 1, 9), 25, true));
        log.append(work("A", local(2025, 3, 9, 23), 25, true));
        log.append(work("A", local(2025, 3, 10, 0), 50, true));
        log.append(work("B", local(2025, 3, 10, 8), 25, false));
        log.append(short_break(local(2025, 3, 10, 9)));
        log.append(work("B", local(2025, 3, 10, 10), 30, true));

        let tasks = TaskRegistry::new();
        let now = local(2025, 3, 10, 12);
        let stats = StatisticsEngine::new(&tasks, &log);

        let today = stats.summarize(Period::Today, now, &tz());
        assert_eq!(today.total_intervals, 2);
        assert_eq!(today.total_minutes, 80);
        assert_eq!(today.average_minutes, 40.0);
        assert_eq!(today.interrupted_intervals, 1);
        assert_eq!(today.break_minutes, 5);
        assert_eq!(
            today.by_task,
            vec![
                TaskTotal { task_name: "A".into(), intervals: 1, minutes: 50 },
                TaskTotal { task_name: "B".into(), intervals: 1, minutes: 30 },
            ]
        );

        let week = stats.summarize(Period::Week, now, &tz());
        assert_eq!(week.total_intervals, 3);
        let month = stats.summarize(Period::Month, now, &tz());
        assert_eq!(month.total_intervals, 4);
    }

    #[test]
    fn most_productive_day_uses_local_date_and_earliest_tie() {
        let mut log = SessionLog::new();
        // 23:00 local on the 8th is 21:00 UTC; still the 8th locally.
        log.append(work("A", local(2025, 3, 8, 23), 25, true));
        log.append(work("A", local(2025, 3, 8, 10), 25, true));
        log.append(work("A", local(2025, 3, 9, 10), 25, true));
        log.append(work("A", local(2025, 3, 9, 11), 25, true));

        let tasks = TaskRegistry::new();
        let report = StatisticsEngine::new(&tasks, &log).summarize(Period::All, local(2025, 3, 10, 12), &tz());
        assert_eq!(
            report.most_productive_day,
            Some(DayCount {
                date: NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
                intervals: 2
            })
        );

        log.append(work("A", local(2025, 3, 9, 12), 25, true));
        let report = StatisticsEngine::new(&tasks, &log).summarize(Period::All, local(2025, 3, 10, 12), &tz());
        assert_eq!(
            report.most_productive_day.map(|d| d.date),
            NaiveDate::from_ymd_opt(2025, 3, 9)
        );
    }

    #[test]
    fn completed_tasks_counted_by_completion_time() {
        let mut tasks = TaskRegistry::new();
        let a = tasks.add("a", 1, Vec::<String>::new(), local(2025, 3, 1, 9)).unwrap().id.clone();
        let b = tasks.add("b", 1, Vec::<String>::new(), local(2025, 3, 1, 9)).unwrap().id.clone();
        tasks.add("c", 1, Vec::<String>::new(), local(2025, 3, 1, 9)).unwrap();
        tasks.complete(&a, local(2025, 3, 2, 9)).unwrap();
        tasks.complete(&b, local(2025, 3, 10, 9)).unwrap();

        let log = SessionLog::new();
        let stats = StatisticsEngine::new(&tasks, &log);
        let now = local(2025, 3, 10, 12);
        assert_eq!(stats.summarize(Period::Today, now, &tz()).completed_tasks, 1);
        assert_eq!(stats.summarize(Period::All, now, &tz()).completed_tasks, 2);
    }

    #[test]
    fn period_parses() {
        assert_eq!("week".parse::<Period>().unwrap(), Period::Week);
        assert!("year".parse::<Period>().is_err());
        assert_eq!(Period::default(), Period::Today);
    }
}
