pub mod config;
pub mod settings;
pub mod stats;
pub mod task;
pub mod timer;

use focusloop_core::{Config, CoreError, Database, Engine};
use serde::Serialize;

/// Open the configured database, seeding settings from `[defaults]`.
pub fn open_engine(config: &Config) -> Result<Engine<Database>, CoreError> {
    let path = config.database_path()?;
    tracing::debug!(path = %path.display(), "opening database");
    let db = Database::open(&path)?.with_seed_settings(config.defaults.clone());
    Ok(Engine::new(db))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
