//! Host timing calibration
//!
//! Sleep calls overshoot by a host-dependent amount. A single probe at
//! start-up measures requested vs. actual sleep and yields a factor used to
//! shorten nominal delays so that real elapsed time lands closer to them.

use crate::constants::{
    CALIBRATION_FACTOR_MAX, CALIBRATION_FACTOR_MIN, CALIBRATION_PROBE_MS, CHORD_DELAY_FLOOR_MS,
    POLL_INTERVAL_FLOOR_MS, POLL_INTERVAL_MS,
};
use log::info;
use std::thread;
use std::time::{Duration, Instant};

/// Delay compensation factor, fixed after start-up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    factor: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::identity()
    }
}

impl Calibration {
    /// No compensation
    pub fn identity() -> Self {
        Self { factor: 1.0 }
    }

    /// Measure the host once by sleeping for the probe duration
    pub fn measure() -> Self {
        let requested = Duration::from_millis(CALIBRATION_PROBE_MS);
        let start = Instant::now();
        thread::sleep(requested);
        let calibration = Self::from_measurement(requested, start.elapsed());
        info!("System delay compensation: {:.3}", calibration.factor);
        calibration
    }

    /// Factor from one requested/actual pair, clamped to a sane range
    pub fn from_measurement(requested: Duration, actual: Duration) -> Self {
        if actual.is_zero() {
            return Self::identity();
        }
        let factor = requested.as_secs_f64() / actual.as_secs_f64();
        Self::from_factor(factor)
    }

    pub fn from_factor(factor: f64) -> Self {
        let factor = if factor.is_finite() {
            factor.clamp(CALIBRATION_FACTOR_MIN, CALIBRATION_FACTOR_MAX)
        } else {
            1.0
        };
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Chord step delay: `key_delay / speed * factor`, never below the floor
    pub fn chord_delay(&self, key_delay_secs: f64, speed_multiplier: f64) -> Duration {
        let floor = Duration::from_millis(CHORD_DELAY_FLOOR_MS);
        if !(speed_multiplier.is_finite() && speed_multiplier > 0.0) {
            return floor;
        }
        let secs = key_delay_secs / speed_multiplier * self.factor;
        match crate::utils::secs_to_duration(secs) {
            Some(delay) => delay.max(floor),
            None => floor,
        }
    }

    /// Poll tick of the background loops, shortened by the factor
    pub fn tick_interval(&self) -> Duration {
        let nominal = Duration::from_millis(POLL_INTERVAL_MS);
        nominal
            .mul_f64(self.factor)
            .min(nominal)
            .max(Duration::from_millis(POLL_INTERVAL_FLOOR_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overshooting_host_shrinks_delays() {
        let cal = Calibration::from_measurement(Duration::from_millis(10), Duration::from_millis(20));
        assert!((cal.factor() - 0.5).abs() < 1e-9);
        assert_eq!(cal.chord_delay(0.05, 1.0), Duration::from_millis(25));
    }

    #[test]
    fn test_factor_is_clamped() {
        let fast = Calibration::from_measurement(Duration::from_millis(10), Duration::from_millis(5));
        assert_eq!(fast.factor(), 1.0);

        let slow = Calibration::from_measurement(Duration::from_millis(10), Duration::from_secs(1));
        assert_eq!(slow.factor(), 0.1);

        let zero = Calibration::from_measurement(Duration::from_millis(10), Duration::ZERO);
        assert_eq!(zero.factor(), 1.0);

        assert_eq!(Calibration::from_factor(f64::NAN).factor(), 1.0);
    }

    #[test]
    fn test_chord_delay_applies_speed_and_floor() {
        let cal = Calibration::identity();
        assert_eq!(cal.chord_delay(0.05, 2.0), Duration::from_millis(25));
        assert_eq!(cal.chord_delay(0.0001, 2.0), Duration::from_millis(1));
        assert_eq!(cal.chord_delay(0.05, 0.0), Duration::from_millis(1));
        assert_eq!(cal.chord_delay(-1.0, 1.0), Duration::from_millis(1));
    }

    #[test]
    fn test_tick_interval_bounds() {
        assert_eq!(Calibration::identity().tick_interval(), Duration::from_millis(10));
        assert_eq!(
            Calibration::from_factor(0.5).tick_interval(),
            Duration::from_millis(5)
        );
        assert_eq!(
            Calibration::from_factor(0.1).tick_interval(),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_measure_stays_in_range() {
        let cal = Calibration::measure();
        assert!(cal.factor() >= 0.1 && cal.factor() <= 1.0);
    }
}
