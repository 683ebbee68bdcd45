pub mod config;
pub mod database;
pub mod migrations;

pub use config::Config;
pub use database::Database;

use std::path::PathBuf;

use crate::error::StorageError;
use crate::snapshot::Snapshot;

/// Durable home of a [`Snapshot`].
///
/// `save` must persist settings, tasks, the interval log and engine state
/// together: either all of it lands or none of it does.
pub trait Store: Send {
    fn load(&mut self) -> Result<Snapshot, StorageError>;
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError>;

    /// Load, apply `op`, and save only if `op` succeeded.
    ///
    /// Stores shared with other processes override this so nothing else can
    /// write between the load and the save.
    fn transact<T, E, F>(&mut self, op: F) -> Result<T, E>
    where
        F: FnOnce(&mut Snapshot) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut snapshot = self.load()?;
        let out = op(&mut snapshot)?;
        self.save(&snapshot)?;
        Ok(out)
    }
}

/// Store that keeps the last saved snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl Store for MemoryStore {
    fn load(&mut self) -> Result<Snapshot, StorageError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        self.snapshot = snapshot.clone();
        Ok(())
    }
}

/// Returns the focusloop data directory, creating it if needed.
///
/// Resolution order:
/// 1. `FOCUSLOOP_DATA_DIR`, used verbatim
/// 2. `~/.config/focusloop-dev` when `FOCUSLOOP_ENV=dev`
/// 3. `~/.config/focusloop`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("FOCUSLOOP_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSLOOP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusloop-dev")
            } else {
                base_dir.join("focusloop")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::StatusFilter;
    use chrono::Utc;

    #[test]
    fn memory_store_returns_last_save() {
        let mut store = MemoryStore::default();
        let mut snap = store.load().unwrap();
        snap.tasks.add("a", 1, Vec::<String>::new(), Utc::now()).unwrap();

        assert!(store.load().unwrap().tasks.is_empty());
        store.save(&snap).unwrap();
        assert_eq!(store.load().unwrap().tasks.list(StatusFilter::All, None).len(), 1);
    }
}
