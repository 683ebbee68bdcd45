use clap::Args;
use focusloop_core::{Database, Engine, Period};

use super::print_json;

#[derive(Args)]
pub struct StatsArgs {
    /// today, week, month or all
    #[arg(long, default_value = "today")]
    period: Period,
}

pub fn run(args: StatsArgs, engine: &Engine<Database>) -> Result<(), Box<dyn std::error::Error>> {
    let report = engine.get_statistics(args.period)?;
    print_json(&report)?;
    Ok(())
}
