use clap::Subcommand;
use focusloop_core::{CoreError, Database, Engine, SettingsUpdate, ValidationError};

use super::print_json;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one or more settings; omitted fields keep their value
    Update {
        /// Default work interval length in minutes
        #[arg(long)]
        work: Option<u32>,
        #[arg(long)]
        short_break: Option<u32>,
        #[arg(long)]
        long_break: Option<u32>,
        /// Completed work intervals per long break
        #[arg(long)]
        cycle: Option<u32>,
        #[arg(long)]
        auto_start_breaks: Option<bool>,
        #[arg(long)]
        auto_start_work: Option<bool>,
    },
}

pub fn run(action: SettingsAction, engine: &Engine<Database>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SettingsAction::Show => print_json(&engine.settings()?)?,
        SettingsAction::Update {
            work,
            short_break,
            long_break,
            cycle,
            auto_start_breaks,
            auto_start_work,
        } => {
            let update = SettingsUpdate {
                work_minutes: work,
                short_break_minutes: short_break,
                long_break_minutes: long_break,
                intervals_before_long_break: cycle,
                auto_start_breaks,
                auto_start_work,
            };
            if update.is_empty() {
                return Err(CoreError::from(ValidationError::InvalidValue {
                    field: "settings".into(),
                    message: "nothing to update; pass at least one option".into(),
                })
                .into());
            }
            print_json(&engine.update_settings(&update)?)?;
        }
    }
    Ok(())
}
