//! TOML-based engine configuration.
//!
//! Stores the engine's tunables:
//! - Analysis cadence and pattern cache window
//! - Persistence debounce and driver tick interval
//! - Retention caps for events, score history and dismissals
//! - Suggestion thresholds
//!
//! Configuration is stored at `~/.config/iku-brain/brain.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{BrainError, ConfigError};

/// Thresholds used by the predictor and the guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Mood at or below this triggers the support suggestion.
    #[serde(default = "default_low_mood")]
    pub low_mood: f64,
    /// Focus minutes today before a break is suggested.
    #[serde(default = "default_break_after_minutes")]
    pub break_after_minutes: f64,
    /// Completed tasks today before the task celebration fires.
    #[serde(default = "default_celebrate_after_tasks")]
    pub celebrate_after_tasks: usize,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/iku-brain/brain.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainConfig {
    /// Seconds between periodic full analyses.
    #[serde(default = "default_analyze_interval_secs")]
    pub analyze_interval_secs: u64,
    /// Seconds during which the last analysis is reused as-is.
    #[serde(default = "default_patterns_cache_secs")]
    pub patterns_cache_secs: u64,
    /// Trailing delay before a recorded event is written out.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    /// How often the async driver calls `tick()`.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_recent_events")]
    pub max_recent_events: usize,
    /// Events older than this are dropped at load.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_max_score_history")]
    pub max_score_history: usize,
    #[serde(default = "default_max_dismissed")]
    pub max_dismissed: usize,
    /// Below this many events the analyzer keeps the previous patterns.
    #[serde(default = "default_min_events_for_analysis")]
    pub min_events_for_analysis: usize,
    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_low_mood() -> f64 {
    4.0
}
fn default_break_after_minutes() -> f64 {
    120.0
}
fn default_celebrate_after_tasks() -> usize {
    5
}
fn default_analyze_interval_secs() -> u64 {
    5 * 60
}
fn default_patterns_cache_secs() -> u64 {
    60
}
fn default_save_debounce_ms() -> u64 {
    1000
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_max_recent_events() -> usize {
    500
}
fn default_retention_days() -> i64 {
    7
}
fn default_max_score_history() -> usize {
    30
}
fn default_max_dismissed() -> usize {
    50
}
fn default_min_events_for_analysis() -> usize {
    10
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_mood: default_low_mood(),
            break_after_minutes: default_break_after_minutes(),
            celebrate_after_tasks: default_celebrate_after_tasks(),
        }
    }
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            analyze_interval_secs: default_analyze_interval_secs(),
            patterns_cache_secs: default_patterns_cache_secs(),
            save_debounce_ms: default_save_debounce_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            max_recent_events: default_max_recent_events(),
            retention_days: default_retention_days(),
            max_score_history: default_max_score_history(),
            max_dismissed: default_max_dismissed(),
            min_events_for_analysis: default_min_events_for_analysis(),
            thresholds: Thresholds::default(),
        }
    }
}

impl BrainConfig {
    pub fn analyze_interval(&self) -> Duration {
        Duration::seconds(self.analyze_interval_secs as i64)
    }

    pub fn patterns_cache(&self) -> Duration {
        Duration::seconds(self.patterns_cache_secs as i64)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::milliseconds(self.save_debounce_ms as i64)
    }

    pub fn retention(&self) -> Duration {
        Duration::days(self.retention_days)
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, BrainError> {
        Ok(data_dir()?.join("brain.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, BrainError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, BrainError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), BrainError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), BrainError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
