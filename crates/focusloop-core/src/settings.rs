//! Interval durations and auto-start flags.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Durations (minutes) and cycle length driving the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_intervals_before_long_break")]
    pub intervals_before_long_break: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_work: bool,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_intervals_before_long_break() -> u32 {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            intervals_before_long_break: default_intervals_before_long_break(),
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub work_minutes: Option<u32>,
    #[serde(default)]
    pub short_break_minutes: Option<u32>,
    #[serde(default)]
    pub long_break_minutes: Option<u32>,
    #[serde(default)]
    pub intervals_before_long_break: Option<u32>,
    #[serde(default)]
    pub auto_start_breaks: Option<bool>,
    #[serde(default)]
    pub auto_start_work: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }
}

impl Settings {
    /// Check every field against its constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("work_minutes", self.work_minutes),
            ("short_break_minutes", self.short_break_minutes),
            ("long_break_minutes", self.long_break_minutes),
            ("intervals_before_long_break", self.intervals_before_long_break),
        ] {
            if value == 0 {
                return Err(ValidationError::positive(field));
            }
        }
        Ok(())
    }

    /// Merge `update` into these settings.
    ///
    /// The merge is all-or-nothing: if any supplied value is invalid,
    /// `self` is left untouched.
    pub fn apply(&mut self, update: &SettingsUpdate) -> Result<(), ValidationError> {
        let mut merged = self.clone();
        if let Some(v) = update.work_minutes {
            merged.work_minutes = v;
        }
        if let Some(v) = update.short_break_minutes {
            merged.short_break_minutes = v;
        }
        if let Some(v) = update.long_break_minutes {
            merged.long_break_minutes = v;
        }
        if let Some(v) = update.intervals_before_long_break {
            merged.intervals_before_long_break = v;
        }
        if let Some(v) = update.auto_start_breaks {
            merged.auto_start_breaks = v;
        }
        if let Some(v) = update.auto_start_work {
            merged.auto_start_work = v;
        }
        merged.validate()?;
        *self = merged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_cycle() {
        let s = Settings::default();
        assert_eq!(s.work_minutes, 25);
        assert_eq!(s.short_break_minutes, 5);
        assert_eq!(s.long_break_minutes, 15);
        assert_eq!(s.intervals_before_long_break, 4);
        assert!(!s.auto_start_breaks);
        assert!(!s.auto_start_work);
    }

    #[test]
    fn apply_changes_only_supplied_fields() {
        let mut s = Settings::default();
        s.apply(&SettingsUpdate {
            work_minutes: Some(50),
            auto_start_breaks: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(s.work_minutes, 50);
        assert!(s.auto_start_breaks);
        assert_eq!(s.short_break_minutes, 5);
        assert_eq!(s.intervals_before_long_break, 4);
    }

    #[test]
    fn apply_rejects_zero_and_leaves_settings_untouched() {
        let mut s = Settings::default();
        let err = s
            .apply(&SettingsUpdate {
                work_minutes: Some(40),
                long_break_minutes: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ValidationError::positive("long_break_minutes"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let s: Settings = serde_json::from_str(r#"{"work_minutes": 30}"#).unwrap();
        assert_eq!(s.work_minutes, 30);
        assert_eq!(s.long_break_minutes, 15);
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(SettingsUpdate::default().is_empty());
        assert!(!SettingsUpdate {
            auto_start_work: Some(false),
            ..Default::default()
        }
        .is_empty());
    }
}
