//! Centralized constants for SpaceShift
//!
//! This module contains all configurable numerical values used throughout
//! the application. Each constant includes documentation on its purpose,
//! unit, and recommended value range.

// ============================================================================
// TRIGGER SOURCES
// ============================================================================

/// Lowest trigger code that is sampled.
/// Unit: virtual-key code (1 = left mouse button)
/// Range: Fixed, do not change without updating Snapshot
pub const TRIGGER_CODE_MIN: u8 = 1;

/// Highest trigger code that is sampled.
/// Unit: virtual-key code (32 = space bar)
/// Range: Fixed, covers mouse buttons and low virtual keys
pub const TRIGGER_CODE_MAX: u8 = 32;

/// Number of candidate trigger sources in one snapshot.
pub const TRIGGER_SOURCE_COUNT: usize = (TRIGGER_CODE_MAX - TRIGGER_CODE_MIN + 1) as usize;

/// Default trigger code (left mouse button).
pub const DEFAULT_TRIGGER_CODE: u8 = 1;

// ============================================================================
// CHORD TIMING
// ============================================================================

/// Default delay between chord steps.
/// Unit: seconds
/// Recommended range: 0.02-0.1
pub const DEFAULT_KEY_DELAY_SECS: f64 = 0.05;

/// Smallest delay accepted from the control panel slider.
/// Unit: seconds
pub const KEY_DELAY_MIN_SECS: f64 = 0.01;

/// Largest delay accepted from the control panel slider.
/// Unit: seconds
pub const KEY_DELAY_MAX_SECS: f64 = 0.5;

/// Delay choices offered by the tray "Key delay" submenu.
/// Unit: milliseconds
/// Range: every entry must lie within KEY_DELAY_MIN_SECS..=KEY_DELAY_MAX_SECS
pub const KEY_DELAY_STOPS_MS: [u64; 9] = [10, 25, 50, 75, 100, 150, 200, 300, 500];

/// Floor applied to the computed chord step delay.
/// Unit: milliseconds
/// Range: Fixed, a chord step never sleeps less than this
pub const CHORD_DELAY_FLOOR_MS: u64 = 1;

/// Default speed multiplier (the "Normal" preset).
pub const DEFAULT_SPEED_MULTIPLIER: f64 = 1.0;

/// Default for repeat-while-held.
pub const DEFAULT_REPEAT_ENABLED: bool = true;

// ============================================================================
// POLLING & THREAD INTERVALS
// ============================================================================

/// Nominal poll interval of the monitor and capture loops.
/// Unit: milliseconds
/// Recommended range: 5-10 (>= 100 Hz sampling)
pub const POLL_INTERVAL_MS: u64 = 10;

/// Lower bound for the calibrated poll interval.
/// Unit: milliseconds
pub const POLL_INTERVAL_FLOOR_MS: u64 = 1;

/// Backoff after a transient sampling or sequencing error.
/// Unit: milliseconds
/// Recommended range: 50-250
pub const ERROR_BACKOFF_MS: u64 = 100;

/// Tray app event loop wake-up interval (drains background events).
/// Unit: milliseconds
/// Recommended range: 16-100
pub const UI_TICK_MS: u64 = 50;

// ============================================================================
// CALIBRATION
// ============================================================================

/// Duration of the start-up sleep probe.
/// Unit: milliseconds
pub const CALIBRATION_PROBE_MS: u64 = 10;

/// Lower clamp for the delay compensation factor.
pub const CALIBRATION_FACTOR_MIN: f64 = 0.1;

/// Upper clamp for the delay compensation factor.
pub const CALIBRATION_FACTOR_MAX: f64 = 1.0;

// ============================================================================
// NOTIFICATION TIMEOUTS
// ============================================================================

/// Standard notification display duration.
/// Unit: milliseconds
/// Recommended range: 2000-5000 (long enough to read, short enough to not annoy)
pub const NOTIFICATION_TIMEOUT_MS: u32 = 3000;

/// Error notification display duration (longer for important messages).
/// Unit: milliseconds
/// Recommended range: 4000-10000 (errors need more attention)
pub const NOTIFICATION_ERROR_TIMEOUT_MS: u32 = 5000;

// ============================================================================
// FILE LOCATIONS
// ============================================================================

/// Directory name under the per-user config directory.
pub const CONFIG_DIR_NAME: &str = "spaceshift";

/// Hidden directory name under the home directory (fallback location).
pub const FALLBACK_DIR_NAME: &str = ".spaceshift";

/// Settings file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
