use clap::Subcommand;
use focusloop_core::{BreakKind, Database, Engine};

use super::print_json;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a work interval (creates the task if no active one has this name)
    Work {
        /// Task name
        task: String,
        /// Interval length; defaults to the work_minutes setting
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Start a break
    Break {
        /// "short" or "long"
        kind: BreakKind,
    },
    /// Stop the running interval
    Stop {
        /// Log the interval as interrupted; it will not count toward the task
        #[arg(long)]
        interrupted: bool,
    },
    /// Print the current timer state as JSON
    Status,
}

pub fn run(action: TimerAction, engine: &Engine<Database>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Work { task, minutes } => print_json(&engine.start_work(&task, minutes)?)?,
        TimerAction::Break { kind } => print_json(&engine.start_break(kind)?)?,
        TimerAction::Stop { interrupted } => print_json(&engine.stop(!interrupted)?)?,
        TimerAction::Status => print_json(&engine.status()?)?,
    }
    Ok(())
}
