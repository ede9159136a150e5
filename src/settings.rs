use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::platform::Platform;

pub const DEFAULT_SCROLL_INTERVAL_SECS: u64 = 5;
pub const MIN_SCROLL_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_DAILY_LIMIT: u64 = 50;
pub const MIN_DAILY_LIMIT: u64 = 5;
pub const MAX_DAILY_LIMIT: u64 = 5000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("scroll interval must be at least 3 seconds (got {0})")]
    IntervalTooShort(u64),
    #[error("daily limit must be between 5 and 5000 (got {0})")]
    LimitOutOfRange(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomationSettings {
    pub scroll_interval_secs: u64,
    pub daily_limit: u64,
    pub skip_sponsored: bool,
    pub selected_platform: Option<Platform>,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            scroll_interval_secs: DEFAULT_SCROLL_INTERVAL_SECS,
            daily_limit: DEFAULT_DAILY_LIMIT,
            skip_sponsored: false,
            selected_platform: None,
        }
    }
}

impl AutomationSettings {
    /// Human-readable problems with the stored values, empty when valid.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Err(err) = validate_interval(self.scroll_interval_secs) {
            errors.push(err.to_string());
        }
        if let Err(err) = validate_limit(self.daily_limit) {
            errors.push(err.to_string());
        }
        errors
    }

    /// Valid values and a platform to run.
    pub fn is_ready(&self) -> bool {
        self.validation_errors().is_empty() && self.selected_platform.is_some()
    }
}

pub fn validate_interval(secs: u64) -> Result<(), SettingsError> {
    if secs < MIN_SCROLL_INTERVAL_SECS {
        return Err(SettingsError::IntervalTooShort(secs));
    }
    Ok(())
}

pub fn validate_limit(limit: u64) -> Result<(), SettingsError> {
    if !(MIN_DAILY_LIMIT..=MAX_DAILY_LIMIT).contains(&limit) {
        return Err(SettingsError::LimitOutOfRange(limit));
    }
    Ok(())
}

/// User preferences persisted as pretty-printed JSON.
///
/// Getters never return out-of-range values: anything invalid that made it
/// into the file is clamped on the way out.
pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<AutomationSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            AutomationSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Store that never touches disk.
    pub fn in_memory(settings: AutomationSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(settings),
        }
    }

    pub fn snapshot(&self) -> AutomationSettings {
        self.read().clone()
    }

    pub fn scroll_interval_secs(&self) -> u64 {
        self.read()
            .scroll_interval_secs
            .max(MIN_SCROLL_INTERVAL_SECS)
    }

    pub fn scroll_interval(&self) -> Duration {
        Duration::from_secs(self.scroll_interval_secs())
    }

    pub fn daily_limit(&self) -> u64 {
        self.read()
            .daily_limit
            .clamp(MIN_DAILY_LIMIT, MAX_DAILY_LIMIT)
    }

    pub fn skip_sponsored(&self) -> bool {
        self.read().skip_sponsored
    }

    pub fn selected_platform(&self) -> Option<Platform> {
        self.read().selected_platform
    }

    pub fn set_scroll_interval_secs(&self, secs: u64) -> Result<()> {
        validate_interval(secs)?;
        self.update(|data| data.scroll_interval_secs = secs)
    }

    pub fn set_daily_limit(&self, limit: u64) -> Result<()> {
        validate_limit(limit)?;
        self.update(|data| data.daily_limit = limit)
    }

    pub fn set_skip_sponsored(&self, enabled: bool) -> Result<()> {
        self.update(|data| data.skip_sponsored = enabled)
    }

    pub fn set_selected_platform(&self, platform: Option<Platform>) -> Result<()> {
        self.update(|data| data.selected_platform = platform)
    }

    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = fs::read_to_string(path)?;
        let data: AutomationSettings = serde_json::from_str(&contents)?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AutomationSettings> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut AutomationSettings)) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut *guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &AutomationSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.snapshot(), AutomationSettings::default());
        assert_eq!(store.scroll_interval(), Duration::from_secs(5));
        assert_eq!(store.daily_limit(), 50);
        assert!(!store.skip_sponsored());
    }

    #[test]
    fn test_setters_validate_and_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        assert!(store.set_scroll_interval_secs(2).is_err());
        assert!(store.set_daily_limit(4).is_err());
        assert!(store.set_daily_limit(5001).is_err());
        store.set_scroll_interval_secs(8).unwrap();
        store.set_daily_limit(5000).unwrap();
        store.set_skip_sponsored(true).unwrap();
        store.set_selected_platform(Some(Platform::LinkedIn)).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(
            reopened.snapshot(),
            AutomationSettings {
                scroll_interval_secs: 8,
                daily_limit: 5000,
                skip_sponsored: true,
                selected_platform: Some(Platform::LinkedIn),
            }
        );
        assert!(reopened.snapshot().is_ready());
    }

    #[test]
    fn test_invalid_stored_values_are_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"scrollIntervalSecs": 1, "dailyLimit": 9000}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.scroll_interval_secs(), MIN_SCROLL_INTERVAL_SECS);
        assert_eq!(store.daily_limit(), MAX_DAILY_LIMIT);
        assert_eq!(store.snapshot().validation_errors().len(), 2);
        assert!(!store.snapshot().is_ready());
    }

    #[test]
    fn test_unreadable_json_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.snapshot(), AutomationSettings::default());
    }
}
