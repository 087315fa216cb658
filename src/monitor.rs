//! Monitor Loop: watches the configured trigger and fires the chord
//!
//! The loop samples exactly one source per tick. The fire decision lives in
//! [`TriggerTracker`], which takes the sample time as an argument so the
//! repeat policy can be driven with simulated clocks.

use crate::calibration::Calibration;
use crate::constants::ERROR_BACKOFF_MS;
use crate::input::{InputSampler, SampleError};
use crate::sequencer::KeySequencer;
use crate::settings::Settings;
use crate::ui::dispatch::UiSender;
use crate::utils::keycode::TriggerCode;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Everything the loop needs, fixed when the loop starts
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub trigger: TriggerCode,
    pub repeat_enabled: bool,
    /// Minimum spacing between repeated chords while held
    pub repeat_interval: Duration,
    /// Step delay handed to the sequencer (speed and calibration applied)
    pub chord_delay: Duration,
    /// Sleep between samples
    pub tick: Duration,
}

impl MonitorConfig {
    pub fn from_settings(settings: &Settings, calibration: &Calibration) -> Self {
        Self {
            trigger: settings.trigger,
            repeat_enabled: settings.repeat_enabled,
            repeat_interval: settings.repeat_interval(),
            chord_delay: calibration.chord_delay(settings.key_delay, settings.speed_multiplier()),
            tick: calibration.tick_interval(),
        }
    }

    /// Real spacing between repeated chords while the trigger is held.
    ///
    /// The loop blocks for the whole chord (2.5 step delays) and then one
    /// tick before it samples again, so a repeat interval shorter than that
    /// cannot be honoured.
    pub fn effective_spacing(&self) -> Duration {
        let chord = self.chord_delay * 5 / 2;
        self.repeat_interval.max(chord + self.tick)
    }
}

/// Edge and repeat bookkeeping for a single trigger source
#[derive(Debug, Clone)]
pub struct TriggerTracker {
    repeat_enabled: bool,
    interval: Duration,
    was_pressed: bool,
    last_fire: Option<Instant>,
}

impl TriggerTracker {
    pub fn new(repeat_enabled: bool, interval: Duration) -> Self {
        Self {
            repeat_enabled,
            interval,
            was_pressed: false,
            last_fire: None,
        }
    }

    /// Feed one sample taken at `now`; returns true when the chord should fire
    pub fn on_sample(&mut self, is_active: bool, now: Instant) -> bool {
        let repeat_due = self.repeat_enabled
            && self
                .last_fire
                .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        let fire = is_active && (!self.was_pressed || repeat_due);

        if fire {
            self.last_fire = Some(now);
        }
        self.was_pressed = is_active;
        fire
    }

    pub fn was_pressed(&self) -> bool {
        self.was_pressed
    }
}

/// Why the loop returned
#[derive(Debug)]
pub enum MonitorExit {
    Cancelled,
    Failed(SampleError),
}

/// One run of the monitor, from start request to idle
pub struct MonitorLoop {
    config: MonitorConfig,
    sampler: Arc<dyn InputSampler>,
    sequencer: KeySequencer,
    events: UiSender,
    cancel: Arc<AtomicBool>,
}

impl MonitorLoop {
    pub fn new(
        config: MonitorConfig,
        sampler: Arc<dyn InputSampler>,
        sequencer: KeySequencer,
        events: UiSender,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            sampler,
            sequencer,
            events,
            cancel,
        }
    }

    /// Poll until cancelled or the sampler fails fatally.
    ///
    /// Both chord keys are released on every exit path.
    pub fn run(self) -> MonitorExit {
        let config = &self.config;
        let backoff = Duration::from_millis(ERROR_BACKOFF_MS);
        info!(
            "Monitoring {} (repeat: {}, interval {:?}, chord step {:?}, tick {:?})",
            config.trigger,
            config.repeat_enabled,
            config.repeat_interval,
            config.chord_delay,
            config.tick
        );
        if config.repeat_enabled && config.effective_spacing() > config.repeat_interval {
            info!(
                "Chords take longer than the repeat interval; repeats every {:?}",
                config.effective_spacing()
            );
        }

        let mut tracker = TriggerTracker::new(config.repeat_enabled, config.repeat_interval);
        let mut chord_failing = false;
        let mut sampling_failing = false;

        let exit = loop {
            if self.cancel.load(Ordering::SeqCst) {
                break MonitorExit::Cancelled;
            }

            let is_active = match self.sampler.is_pressed(config.trigger) {
                Ok(active) => {
                    if sampling_failing {
                        info!("Sampling {} recovered", config.trigger);
                        sampling_failing = false;
                    }
                    active
                }
                Err(e) if e.is_fatal() => {
                    error!("Monitor stopping: {}", e);
                    self.events
                        .error(format!("Trigger monitoring stopped: {}", e));
                    break MonitorExit::Failed(e);
                }
                Err(e) => {
                    if sampling_failing {
                        debug!("Sampling {} still failing: {}", config.trigger, e);
                    } else {
                        warn!("Sampling {} failed: {}", config.trigger, e);
                        sampling_failing = true;
                    }
                    thread::sleep(backoff);
                    continue;
                }
            };

            if tracker.on_sample(is_active, Instant::now()) {
                debug!("{} fired", config.trigger);
                match self.sequencer.emit_chord(config.chord_delay) {
                    Ok(()) => chord_failing = false,
                    Err(e) => {
                        // Only the first failure of a streak reaches the user
                        if !chord_failing {
                            self.events.warning(format!("Could not send keys: {}", e));
                        }
                        chord_failing = true;
                        thread::sleep(backoff);
                        continue;
                    }
                }
            }

            thread::sleep(config.tick);
        };

        if let Err(e) = self.sequencer.release_both() {
            warn!("Releasing chord keys on exit failed: {}", e);
            self.sequencer.emergency_release();
        }
        info!("Monitor stopped");
        exit
    }
}
