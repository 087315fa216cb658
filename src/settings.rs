//! The persisted settings record and the speed presets

use crate::constants::{
    DEFAULT_KEY_DELAY_SECS, DEFAULT_REPEAT_ENABLED, DEFAULT_SPEED_MULTIPLIER, KEY_DELAY_MAX_SECS,
    KEY_DELAY_MIN_SECS,
};
use crate::utils::keycode::TriggerCode;
use crate::utils::secs_to_duration;
use std::fmt;
use std::time::Duration;

/// Discrete chord speed; the multiplier divides the chord step delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpeedPreset {
    VerySlow,
    Slow,
    #[default]
    Normal,
    Fast,
    VeryFast,
}

impl SpeedPreset {
    pub const ALL: [SpeedPreset; 5] = [
        SpeedPreset::VerySlow,
        SpeedPreset::Slow,
        SpeedPreset::Normal,
        SpeedPreset::Fast,
        SpeedPreset::VeryFast,
    ];

    pub fn multiplier(self) -> f64 {
        match self {
            SpeedPreset::VerySlow => 0.3,
            SpeedPreset::Slow => 0.6,
            SpeedPreset::Normal => 1.0,
            SpeedPreset::Fast => 1.5,
            SpeedPreset::VeryFast => 2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeedPreset::VerySlow => "Very Slow",
            SpeedPreset::Slow => "Slow",
            SpeedPreset::Normal => "Normal",
            SpeedPreset::Fast => "Fast",
            SpeedPreset::VeryFast => "Very Fast",
        }
    }

    /// Exact match against the preset multipliers
    pub fn from_multiplier(multiplier: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| (preset.multiplier() - multiplier).abs() < 1e-9)
    }

    /// Closest preset to an arbitrary multiplier (non-finite maps to Normal)
    pub fn nearest(multiplier: f64) -> Self {
        if !multiplier.is_finite() {
            return SpeedPreset::Normal;
        }
        Self::ALL
            .into_iter()
            .min_by(|a, b| {
                let da = (a.multiplier() - multiplier).abs();
                let db = (b.multiplier() - multiplier).abs();
                da.total_cmp(&db)
            })
            .unwrap_or_default()
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for SpeedPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (x{})", self.label(), self.multiplier())
    }
}

/// Application settings, mutated by the control panel and persisted on every change
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Trigger source that fires the chord
    pub trigger: TriggerCode,
    /// Re-fire the chord while the trigger is held
    pub repeat_enabled: bool,
    /// Nominal delay between chord steps, in seconds (always > 0)
    pub key_delay: f64,
    /// Chord speed preset
    pub speed: SpeedPreset,
    /// Repeat cadence in seconds; None follows `key_delay`
    pub repeat_interval: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            trigger: TriggerCode::DEFAULT,
            repeat_enabled: DEFAULT_REPEAT_ENABLED,
            key_delay: DEFAULT_KEY_DELAY_SECS,
            speed: SpeedPreset::nearest(DEFAULT_SPEED_MULTIPLIER),
            repeat_interval: None,
        }
    }
}

impl Settings {
    pub fn speed_multiplier(&self) -> f64 {
        self.speed.multiplier()
    }

    /// Interval between repeated chords while the trigger is held.
    ///
    /// Independent of the speed preset and of host calibration.
    pub fn repeat_interval(&self) -> Duration {
        self.repeat_interval
            .and_then(secs_to_duration)
            .or_else(|| secs_to_duration(self.key_delay))
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_KEY_DELAY_SECS))
    }
}

/// Clamp a slider value into the accepted delay range.
///
/// Returns None for NaN or infinite input.
pub fn clamp_key_delay(secs: f64) -> Option<f64> {
    secs.is_finite()
        .then(|| secs.clamp(KEY_DELAY_MIN_SECS, KEY_DELAY_MAX_SECS))
}
