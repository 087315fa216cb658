//! Settings file management
//!
//! This module loads and saves the settings record as a small TOML document
//! with a single `[Settings]` table. Writes go to the per-user config
//! directory; when that fails the store moves to a fallback location under
//! the home directory for the rest of the session, and when that fails too
//! it keeps running without persistence.

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, FALLBACK_DIR_NAME};
use crate::settings::{Settings, SpeedPreset};
use crate::utils::keycode::TriggerCode;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write settings file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(
        "settings could not be saved to {} nor to {}: {reason}",
        primary.display(),
        fallback.display()
    )]
    Unavailable {
        primary: PathBuf,
        fallback: PathBuf,
        reason: String,
    },
}

/// On-disk document: one `[Settings]` table
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(rename = "Settings", default)]
    settings: SettingsRecord,
}

/// Raw key/value record as stored on disk.
///
/// Every key is optional so that a missing key falls back to its default
/// without discarding the rest of the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_key: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_interval: Option<f64>,
}

impl SettingsRecord {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            trigger_key: Some(i64::from(settings.trigger.get())),
            repeat_enabled: Some(settings.repeat_enabled),
            key_delay: Some(settings.key_delay),
            speed_multiplier: Some(settings.speed_multiplier()),
            repeat_interval: settings.repeat_interval,
        }
    }

    /// Convert to validated settings.
    ///
    /// Returns the settings plus a description of every value that had to be
    /// replaced. Missing keys take their default silently.
    pub fn into_settings(self) -> (Settings, Vec<String>) {
        let defaults = Settings::default();
        let mut fixes = Vec::new();

        let trigger = match self.trigger_key {
            None => defaults.trigger,
            Some(raw) => match u8::try_from(raw).ok().and_then(TriggerCode::new) {
                Some(code) => code,
                None => {
                    fixes.push(format!(
                        "trigger_key {} is out of range, using {}",
                        raw,
                        defaults.trigger.get()
                    ));
                    defaults.trigger
                }
            },
        };

        let key_delay = match self.key_delay {
            None => defaults.key_delay,
            Some(delay) if delay.is_finite() && delay > 0.0 => delay,
            Some(delay) => {
                fixes.push(format!(
                    "key_delay {} must be positive, using {}",
                    delay, defaults.key_delay
                ));
                defaults.key_delay
            }
        };

        let speed = match self.speed_multiplier {
            None => defaults.speed,
            Some(multiplier) => match SpeedPreset::from_multiplier(multiplier) {
                Some(preset) => preset,
                None => {
                    let preset = SpeedPreset::nearest(multiplier);
                    fixes.push(format!(
                        "speed_multiplier {} is not a preset, using {}",
                        multiplier,
                        preset.multiplier()
                    ));
                    preset
                }
            },
        };

        let repeat_interval = match self.repeat_interval {
            None => None,
            Some(interval) if interval.is_finite() && interval > 0.0 => Some(interval),
            Some(interval) => {
                fixes.push(format!(
                    "repeat_interval {} must be positive, following key_delay",
                    interval
                ));
                None
            }
        };

        let settings = Settings {
            trigger,
            repeat_enabled: self.repeat_enabled.unwrap_or(defaults.repeat_enabled),
            key_delay,
            speed,
            repeat_interval,
        };
        (settings, fixes)
    }
}

/// Where the store currently writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLocation {
    Primary,
    Fallback,
    /// Both locations failed; settings live in memory only
    Memory,
}

/// Result of loading the settings file
#[derive(Debug)]
pub struct LoadOutcome {
    pub settings: Settings,
    /// User-facing warnings (corrupt file, repaired values, fallback in use)
    pub warnings: Vec<String>,
}

/// Result of a successful save call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// The primary location failed and the fallback took over (reported once)
    FellBack(PathBuf),
    /// Persistence is disabled for this session
    Skipped,
}

/// Loads and saves [`Settings`], tracking which location is active
#[derive(Debug)]
pub struct SettingsStore {
    primary: PathBuf,
    fallback: PathBuf,
    location: StoreLocation,
}

impl SettingsStore {
    pub fn new(primary: PathBuf, fallback: PathBuf) -> Self {
        Self {
            primary,
            fallback,
            location: StoreLocation::Primary,
        }
    }

    /// Store at the standard locations
    ///
    /// - macOS: `~/Library/Application Support/spaceshift/config.toml`
    /// - Linux: `~/.config/spaceshift/config.toml`
    /// - Windows: `%APPDATA%\spaceshift\config.toml`
    ///
    /// Fallback: `~/.spaceshift/config.toml`.
    pub fn open_default() -> Self {
        Self::new(Self::config_path(), Self::fallback_path())
    }

    /// Store whose primary path is `primary`, keeping the standard fallback
    pub fn with_primary(primary: PathBuf) -> Self {
        Self::new(primary, Self::fallback_path())
    }

    /// Get the standard config file path
    pub fn config_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
            None => Self::fallback_path(),
        }
    }

    /// Get the fallback config file path under the home directory
    pub fn fallback_path() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(FALLBACK_DIR_NAME).join(CONFIG_FILE_NAME),
            None => PathBuf::from(CONFIG_FILE_NAME),
        }
    }

    pub fn location(&self) -> StoreLocation {
        self.location
    }

    /// Path that reads and writes currently target (None when in-memory)
    pub fn active_path(&self) -> Option<&Path> {
        match self.location {
            StoreLocation::Primary => Some(&self.primary),
            StoreLocation::Fallback => Some(&self.fallback),
            StoreLocation::Memory => None,
        }
    }

    /// Load settings, creating or repairing the file as needed.
    ///
    /// Never fails: a missing file is created with defaults, an unreadable or
    /// unparsable one is replaced with defaults, and out-of-range values are
    /// repaired and written back.
    pub fn load(&mut self) -> LoadOutcome {
        let mut warnings = Vec::new();

        // A previous session may have fallen back already
        if self.location == StoreLocation::Primary
            && !self.primary.exists()
            && self.fallback.exists()
        {
            info!(
                "Primary settings file missing, using fallback at {}",
                self.fallback.display()
            );
            self.location = StoreLocation::Fallback;
        }

        let Some(path) = self.active_path().map(Path::to_path_buf) else {
            return LoadOutcome {
                settings: Settings::default(),
                warnings,
            };
        };

        let (settings, needs_write) = if !path.exists() {
            info!("No settings file at {}, creating defaults", path.display());
            (Settings::default(), true)
        } else {
            match Self::read_record(&path) {
                Ok(record) => {
                    let (settings, fixes) = record.into_settings();
                    for fix in &fixes {
                        warn!("Settings: {}", fix);
                    }
                    if !fixes.is_empty() {
                        warnings.push(format!(
                            "Some settings were invalid and have been reset: {}",
                            fixes.join("; ")
                        ));
                    }
                    let repaired = !fixes.is_empty();
                    (settings, repaired)
                }
                Err(e) => {
                    warn!("Failed to load settings file: {:#}", e);
                    warnings.push(format!(
                        "Settings file was unreadable and has been reset to defaults ({})",
                        e
                    ));
                    (Settings::default(), true)
                }
            }
        };

        if needs_write {
            match self.save(&settings) {
                Ok(SaveOutcome::FellBack(path)) => warnings.push(fallback_notice(&path)),
                Ok(_) => {}
                Err(e) => warnings.push(persistence_lost_notice(&e)),
            }
        }

        LoadOutcome { settings, warnings }
    }

    /// Load a settings file from a specific path without repairing it
    pub fn load_from_path(path: &Path) -> anyhow::Result<Settings> {
        let record = Self::read_record(path)?;
        Ok(record.into_settings().0)
    }

    fn read_record(path: &Path) -> anyhow::Result<SettingsRecord> {
        use anyhow::Context;

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let document: ConfigDocument =
            toml::from_str(&contents).context("Failed to parse settings file")?;
        Ok(document.settings)
    }

    /// Persist settings to the active location.
    ///
    /// On a write failure at the primary location the fallback is tried and,
    /// if it works, becomes the active location for the rest of the session.
    pub fn save(&mut self, settings: &Settings) -> Result<SaveOutcome, StoreError> {
        let document = ConfigDocument {
            settings: SettingsRecord::from_settings(settings),
        };
        let contents = toml::to_string_pretty(&document)?;

        match self.location {
            StoreLocation::Memory => {
                debug!("Persistence disabled, settings kept in memory");
                Ok(SaveOutcome::Skipped)
            }
            StoreLocation::Fallback => match write_file(&self.fallback, &contents) {
                Ok(()) => {
                    debug!("Settings saved to: {}", self.fallback.display());
                    Ok(SaveOutcome::Saved(self.fallback.clone()))
                }
                Err(fallback_err) => {
                    warn!("{}; trying primary location", fallback_err);
                    match write_file(&self.primary, &contents) {
                        Ok(()) => {
                            info!("Settings saved to: {}", self.primary.display());
                            self.location = StoreLocation::Primary;
                            Ok(SaveOutcome::Saved(self.primary.clone()))
                        }
                        Err(primary_err) => Err(self.give_up(primary_err)),
                    }
                }
            },
            StoreLocation::Primary => match write_file(&self.primary, &contents) {
                Ok(()) => {
                    debug!("Settings saved to: {}", self.primary.display());
                    Ok(SaveOutcome::Saved(self.primary.clone()))
                }
                Err(primary_err) => {
                    warn!("{}; trying fallback location", primary_err);
                    match write_file(&self.fallback, &contents) {
                        Ok(()) => {
                            info!("Settings saved to fallback: {}", self.fallback.display());
                            self.location = StoreLocation::Fallback;
                            Ok(SaveOutcome::FellBack(self.fallback.clone()))
                        }
                        Err(fallback_err) => Err(self.give_up(fallback_err)),
                    }
                }
            },
        }
    }

    /// Both locations failed: keep settings in memory from now on
    fn give_up(&mut self, last: StoreError) -> StoreError {
        warn!("{}; continuing without persistence", last);
        self.location = StoreLocation::Memory;
        StoreError::Unavailable {
            primary: self.primary.clone(),
            fallback: self.fallback.clone(),
            reason: last.to_string(),
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), StoreError> {
    let to_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_err)?;
    }
    fs::write(path, contents).map_err(to_err)
}

/// One-time notice shown when the fallback location takes over
pub fn fallback_notice(path: &Path) -> String {
    format!(
        "Could not write to the settings folder; settings are now saved to {}",
        path.display()
    )
}

/// Notice shown when neither location can be written
pub fn persistence_lost_notice(err: &StoreError) -> String {
    format!("Settings will not be saved this session: {}", err)
}
