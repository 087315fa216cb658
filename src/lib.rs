// Library interface for SpaceShift
// This allows tests and both binaries to share the core functionality

pub mod app_state;
pub mod calibration;
pub mod capture;
pub mod config;
pub mod config_file;
pub mod constants;
pub mod input;
pub mod monitor;
pub mod sequencer;
pub mod settings;
pub mod ui;
pub mod utils;

use anyhow::Result;
use app_state::{AppState, Session};
use calibration::Calibration;
use capture::{CaptureExit, CaptureSession};
use config_file::{fallback_notice, persistence_lost_notice, SaveOutcome, SettingsStore};
use input::{InputBackend, InputSampler};
use log::{info, warn};
use monitor::{MonitorConfig, MonitorLoop};
use parking_lot::Mutex;
use sequencer::KeySequencer;
use settings::{Settings, SpeedPreset};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use ui::dispatch::{self, UiReceiver, UiSender};
use ui::UiEvent;

/// Core SpaceShift functionality shared between CLI and Tray App
pub struct SpaceShiftCore {
    pub state: AppState,
    store: Arc<Mutex<SettingsStore>>,
    sampler: Arc<dyn InputSampler>,
    sequencer: KeySequencer,
    calibration: Calibration,
    events: UiSender,
    receiver: UiReceiver,
}

impl SpaceShiftCore {
    /// Load settings from `store` and wire up the input backend.
    ///
    /// Problems found while loading (corrupt file, repaired values, fallback
    /// location) are queued as warning notices.
    pub fn new(backend: InputBackend, mut store: SettingsStore, calibration: Calibration) -> Self {
        let (events, receiver) = dispatch::channel();

        let outcome = store.load();
        for warning in outcome.warnings {
            events.warning(warning);
        }
        if let Some(path) = store.active_path() {
            info!("Settings loaded from: {}", path.display());
        }

        Self {
            state: AppState::new(outcome.settings),
            store: Arc::new(Mutex::new(store)),
            sampler: backend.sampler,
            sequencer: KeySequencer::new(backend.synth),
            calibration,
            events,
            receiver,
        }
    }

    /// Receiver for events produced by this core and its workers
    pub fn events(&self) -> UiReceiver {
        self.receiver.clone()
    }

    pub fn settings(&self) -> Settings {
        self.state.settings()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn is_capturing(&self) -> bool {
        self.state.is_capturing()
    }

    /// File the settings are currently written to (None once persistence is lost)
    pub fn settings_path(&self) -> Option<PathBuf> {
        self.store.lock().active_path().map(|p| p.to_path_buf())
    }

    /// Start the Monitor Loop when idle, stop it when running.
    ///
    /// Refused with a warning while a capture session is active.
    pub fn toggle_run(&self) -> Result<()> {
        match self.state.session() {
            Session::Capturing => {
                warn!("Start ignored: trigger capture in progress");
                self.events
                    .warning("Finish setting the trigger before starting");
                Ok(())
            }
            Session::Monitoring if !self.state.is_stopping() => {
                self.state.request_stop();
                info!("Stop requested");
                Ok(())
            }
            _ => self.start_monitor(),
        }
    }

    fn start_monitor(&self) -> Result<()> {
        let settings = self.state.settings();
        let config = MonitorConfig::from_settings(&settings, &self.calibration);
        let ticket = self.state.begin_session(Session::Monitoring);

        let monitor = MonitorLoop::new(
            config,
            self.sampler.clone(),
            self.sequencer.clone(),
            self.events.clone(),
            ticket.cancel.clone(),
        );
        let state = self.state.clone();
        let events = self.events.clone();
        let previous = ticket.previous;
        let id = ticket.id;

        let spawned = thread::Builder::new()
            .name("monitor".to_string())
            .spawn(move || {
                app_state::join_previous(previous);
                // Sent from here so it always follows the previous loop's stop event
                events.send(UiEvent::RunStateChanged(true));
                monitor.run();
                state.finish_session(id);
                events.send(UiEvent::RunStateChanged(false));
            });

        match spawned {
            Ok(handle) => {
                self.state.set_worker(handle);
                Ok(())
            }
            Err(e) => {
                self.state.finish_session(id);
                Err(anyhow::Error::new(e).context("Failed to spawn monitor thread"))
            }
        }
    }

    /// Enter trigger-learning mode, stopping the monitor first if it runs.
    ///
    /// A no-op while a capture is already in progress.
    pub fn start_capture(&self) -> Result<()> {
        if self.state.is_capturing() {
            info!("Capture already in progress");
            return Ok(());
        }

        let ticket = self.state.begin_session(Session::Capturing);
        let session = CaptureSession::new(
            self.sampler.clone(),
            self.state.clone(),
            self.store.clone(),
            self.events.clone(),
            ticket.cancel.clone(),
            self.calibration.tick_interval(),
        )
        .after(ticket.previous);
        let state = self.state.clone();
        let events = self.events.clone();
        let id = ticket.id;

        let spawned = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                events.send(UiEvent::CaptureStateChanged(true));
                if let CaptureExit::Cancelled = session.run() {
                    info!("Capture ended without a new trigger");
                }
                state.finish_session(id);
                events.send(UiEvent::CaptureStateChanged(false));
            });

        match spawned {
            Ok(handle) => {
                self.state.set_worker(handle);
                Ok(())
            }
            Err(e) => {
                self.state.finish_session(id);
                Err(anyhow::Error::new(e).context("Failed to spawn capture thread"))
            }
        }
    }

    pub fn set_repeat(&self, enabled: bool) {
        self.change_settings(|s| s.repeat_enabled = enabled);
        info!("Repeat while held: {}", if enabled { "on" } else { "off" });
    }

    /// Set the key delay in seconds, clamped to the slider range
    pub fn set_delay(&self, seconds: f64) {
        match settings::clamp_key_delay(seconds) {
            Some(delay) => {
                self.change_settings(|s| s.key_delay = delay);
                info!("Key delay set to {}", utils::format_millis(delay));
            }
            None => {
                warn!("Ignoring invalid key delay: {}", seconds);
                self.events
                    .warning(format!("Invalid key delay: {}", seconds));
            }
        }
    }

    pub fn set_speed(&self, speed: SpeedPreset) {
        self.change_settings(|s| s.speed = speed);
        info!("Speed set to {}", speed);
    }

    /// Set an explicit repeat interval in seconds, or follow the key delay
    pub fn set_repeat_interval(&self, seconds: Option<f64>) {
        match seconds {
            Some(secs) if utils::secs_to_duration(secs).is_none() => {
                warn!("Ignoring invalid repeat interval: {}", secs);
                self.events
                    .warning(format!("Invalid repeat interval: {}", secs));
            }
            _ => {
                self.change_settings(|s| s.repeat_interval = seconds);
                match seconds {
                    Some(secs) => info!("Repeat interval set to {}", utils::format_millis(secs)),
                    None => info!("Repeat interval follows the key delay"),
                }
            }
        }
    }

    /// Restore and persist the default settings
    pub fn reset_settings(&self) {
        self.change_settings(|s| *s = Settings::default());
        self.events.send(UiEvent::TriggerChanged(self.settings().trigger));
        self.events.info("Settings restored to defaults");
        info!("Settings reset to defaults");
    }

    fn change_settings<F>(&self, change: F)
    where
        F: FnOnce(&mut Settings),
    {
        let settings = self.state.update_settings(change);
        persist_settings(&self.store, &settings, &self.events);
        if self.state.is_running() {
            info!("Settings change takes effect the next time monitoring starts");
        }
    }

    /// Stop any worker, wait for it, and make sure no chord key stays held
    pub fn shutdown(&self) {
        if self.state.request_stop() {
            info!("Stopping background worker");
        }
        if let Some(worker) = self.state.take_worker() {
            if worker.join().is_err() {
                warn!("Background worker panicked");
            }
        }
        if let Err(e) = self.sequencer.release_both() {
            warn!("Final key release failed: {}", e);
        }
        info!("Shutdown complete");
    }
}

/// Save `settings` and turn the store's outcome into user notices
pub(crate) fn persist_settings(
    store: &Mutex<SettingsStore>,
    settings: &Settings,
    events: &UiSender,
) {
    match store.lock().save(settings) {
        Ok(SaveOutcome::FellBack(path)) => events.warning(fallback_notice(&path)),
        Ok(SaveOutcome::Saved(_)) | Ok(SaveOutcome::Skipped) => {}
        Err(e) => {
            warn!("Failed to save settings: {}", e);
            events.warning(persistence_lost_notice(&e));
        }
    }
}
