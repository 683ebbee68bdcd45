//! Everything one operation loads, mutates and persists as a unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::session_log::SessionLog;
use crate::settings::{Settings, SettingsUpdate};
use crate::stats::StatisticsEngine;
use crate::task::TaskRegistry;
use crate::timer::{status_of, EngineState, Status, TimerController};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub settings: Settings,
    pub tasks: TaskRegistry,
    pub log: SessionLog,
    pub state: EngineState,
}

impl Snapshot {
    /// Empty snapshot seeded with `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        let state = EngineState::new(&settings);
        Self {
            settings,
            tasks: TaskRegistry::new(),
            log: SessionLog::new(),
            state,
        }
    }

    pub fn timer(&mut self) -> TimerController<'_> {
        TimerController::new(&self.settings, &mut self.tasks, &mut self.log, &mut self.state)
    }

    pub fn status(&self, now: DateTime<Utc>) -> Status {
        status_of(&self.state, &self.tasks, now)
    }

    pub fn stats(&self) -> StatisticsEngine<'_> {
        StatisticsEngine::new(&self.tasks, &self.log)
    }

    /// Merge a settings update and keep the long-break counter in range.
    pub fn update_settings(&mut self, update: &SettingsUpdate) -> Result<&Settings, ValidationError> {
        self.settings.apply(update)?;
        self.state.clamp_to(self.settings.intervals_before_long_break);
        Ok(&self.settings)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}
