//! Property tests for the timer state machine.

use chrono::{Duration, TimeZone, Utc};
use focusloop_core::{BreakKind, Settings, Snapshot};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Work { completed: bool },
    Break { long: bool, completed: bool },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => any::<bool>().prop_map(|completed| Step::Work { completed }),
        1 => (any::<bool>(), any::<bool>()).prop_map(|(long, completed)| Step::Break { long, completed }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cycle_counter_matches_model(
        cycle in 1u32..8,
        steps in prop::collection::vec(arb_step(), 0..40),
    ) {
        let mut snap = Snapshot::with_settings(Settings {
            intervals_before_long_break: cycle,
            ..Settings::default()
        });
        let mut now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut expected = cycle;
        let mut completed_work = 0u32;

        for step in &steps {
            let completed = match *step {
                Step::Work { completed } => {
                    snap.timer().start_work("Task", None, now).unwrap();
                    completed
                }
                Step::Break { long, completed } => {
                    let kind = if long { BreakKind::Long } else { BreakKind::Short };
                    snap.timer().start_break(kind, now).unwrap();
                    completed
                }
            };
            now += Duration::minutes(7);
            let out = snap.timer().stop(completed, now).unwrap();

            let counts = matches!(step, Step::Work { .. }) && completed;
            let mut due = false;
            if counts {
                completed_work += 1;
                if expected <= 1 {
                    expected = cycle;
                    due = true;
                } else {
                    expected -= 1;
                }
            }
            prop_assert_eq!(out.intervals_until_long_break, expected);
            prop_assert_eq!(out.long_break_due, due);
            prop_assert!((1..=cycle).contains(&out.intervals_until_long_break));
        }

        prop_assert_eq!(snap.log.len(), steps.len());
        let credited: u32 = snap.tasks.iter().map(|t| t.completed_intervals).sum();
        prop_assert_eq!(credited, completed_work);
        prop_assert!(!snap.state.is_running());
    }

    #[test]
    fn remaining_time_never_increases(
        minutes in 1u32..120,
        ticks in prop::collection::vec(0i64..900, 1..30),
    ) {
        let mut snap = Snapshot::default();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        snap.timer().start_work("Task", Some(minutes), start).unwrap();

        let mut now = start;
        let mut last = i64::from(minutes) * 60;
        for tick in ticks {
            now += Duration::seconds(tick);
            let remaining = snap.status(now).remaining_seconds().unwrap();
            prop_assert!(remaining <= last);
            prop_assert!(remaining >= 0);
            prop_assert!(snap.status(now).is_running());
            last = remaining;
        }
    }
}
