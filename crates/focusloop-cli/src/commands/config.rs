use clap::Subcommand;
use focusloop_core::{Config, CoreError};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "log_filter", "defaults.work_minutes")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
}

pub fn run(action: ConfigAction, mut config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => match config.get(&key).map_err(CoreError::from)? {
            Some(value) => println!("{value}"),
            None => eprintln!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            config.set(&key, &value).map_err(CoreError::from)?;
            config.save().map_err(CoreError::from)?;
            println!("ok");
        }
        ConfigAction::List => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
    }
    Ok(())
}
