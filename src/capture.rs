//! Capture Session: learn the trigger from the next button or key press
//!
//! The session first waits for the previous worker to finish, so a running
//! monitor has fully released the chord keys before sampling starts. It then
//! takes a baseline snapshot of every source and reports the lowest source
//! that goes from released to pressed between two consecutive samples.

use crate::app_state::AppState;
use crate::config_file::SettingsStore;
use crate::constants::ERROR_BACKOFF_MS;
use crate::input::{InputSampler, SampleError, Snapshot};
use crate::ui::dispatch::UiSender;
use crate::ui::UiEvent;
use crate::utils::keycode::TriggerCode;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Why the session returned
#[derive(Debug)]
pub enum CaptureExit {
    Captured(TriggerCode),
    Cancelled,
    Failed(SampleError),
}

pub struct CaptureSession {
    sampler: Arc<dyn InputSampler>,
    state: AppState,
    store: Arc<Mutex<SettingsStore>>,
    events: UiSender,
    cancel: Arc<AtomicBool>,
    tick: Duration,
    previous: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn new(
        sampler: Arc<dyn InputSampler>,
        state: AppState,
        store: Arc<Mutex<SettingsStore>>,
        events: UiSender,
        cancel: Arc<AtomicBool>,
        tick: Duration,
    ) -> Self {
        Self {
            sampler,
            state,
            store,
            events,
            cancel,
            tick,
            previous: None,
        }
    }

    /// Worker to wait for before the first sample
    pub fn after(mut self, previous: Option<JoinHandle<()>>) -> Self {
        self.previous = previous;
        self
    }

    pub fn run(mut self) -> CaptureExit {
        crate::app_state::join_previous(self.previous.take());

        let mut baseline = match self.next_sample() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return CaptureExit::Cancelled,
            Err(e) => return self.fail(e),
        };
        info!("Capture started, waiting for a button or key press");

        loop {
            thread::sleep(self.tick);
            let current = match self.next_sample() {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    info!("Capture cancelled");
                    return CaptureExit::Cancelled;
                }
                Err(e) => return self.fail(e),
            };

            if let Some(code) = current.first_just_pressed(&baseline) {
                self.apply(code);
                return CaptureExit::Captured(code);
            }
            baseline = current;
        }
    }

    /// Sample every source, retrying transient failures.
    ///
    /// Ok(None) means the session was cancelled.
    fn next_sample(&self) -> Result<Option<Snapshot>, SampleError> {
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Ok(None);
            }
            match self.sampler.sample() {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Capture sampling failed: {}", e);
                    thread::sleep(Duration::from_millis(ERROR_BACKOFF_MS));
                }
            }
        }
    }

    fn fail(&self, e: SampleError) -> CaptureExit {
        error!("Capture stopped: {}", e);
        self.events.error(format!("Trigger capture failed: {}", e));
        CaptureExit::Failed(e)
    }

    fn apply(&self, code: TriggerCode) {
        let settings = self.state.update_settings(|s| s.trigger = code);
        info!("Trigger set to {}", code);
        crate::persist_settings(&self.store, &settings, &self.events);
        self.events.send(UiEvent::TriggerChanged(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::mock::MockSampler;
    use crate::ui::dispatch;
    use std::path::PathBuf;

    fn temp_store(name: &str) -> (PathBuf, Arc<Mutex<SettingsStore>>) {
        let dir = std::env::temp_dir().join(format!(
            "spaceshift_capture_{}_{:?}_{}",
            name,
            thread::current().id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let store = SettingsStore::new(dir.join("primary.toml"), dir.join("fallback.toml"));
        (dir, Arc::new(Mutex::new(store)))
    }

    fn code(n: u8) -> TriggerCode {
        TriggerCode::new(n).unwrap()
    }

    #[test]
    fn test_capture_learns_first_new_press() {
        let (dir, store) = temp_store("learn");
        let sampler = Arc::new(MockSampler::new());
        let state = AppState::default();
        let (tx, rx) = dispatch::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        // Held before capture starts: part of the baseline, never an edge
        sampler.press(code(1));

        let session = CaptureSession::new(
            sampler.clone(),
            state.clone(),
            store.clone(),
            tx,
            cancel,
            Duration::from_millis(1),
        );
        let handle = thread::spawn(move || session.run());

        thread::sleep(Duration::from_millis(50));
        sampler.press(code(5));

        let exit = handle.join().unwrap();
        assert!(matches!(exit, CaptureExit::Captured(c) if c == code(5)));
        assert_eq!(state.settings().trigger, code(5));
        assert!(rx.drain().contains(&UiEvent::TriggerChanged(code(5))));

        let saved = SettingsStore::load_from_path(&dir.join("primary.toml")).unwrap();
        assert_eq!(saved.trigger, code(5));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_capture_cancel_leaves_settings_alone() {
        let (dir, store) = temp_store("cancel");
        let sampler = Arc::new(MockSampler::new());
        let state = AppState::default();
        let (tx, rx) = dispatch::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let session = CaptureSession::new(
            sampler,
            state.clone(),
            store,
            tx,
            cancel.clone(),
            Duration::from_millis(1),
        );
        let handle = thread::spawn(move || session.run());
        thread::sleep(Duration::from_millis(20));
        cancel.store(true, Ordering::SeqCst);

        assert!(matches!(handle.join().unwrap(), CaptureExit::Cancelled));
        assert_eq!(state.settings().trigger, TriggerCode::DEFAULT);
        assert!(rx.drain().is_empty());
        assert!(!dir.join("primary.toml").exists());
    }

    #[test]
    fn test_capture_fatal_sampling_error() {
        let (_dir, store) = temp_store("fatal");
        let sampler = Arc::new(MockSampler::new());
        sampler.make_unavailable();
        let (tx, rx) = dispatch::channel();

        let exit = CaptureSession::new(
            sampler,
            AppState::default(),
            store,
            tx,
            Arc::new(AtomicBool::new(false)),
            Duration::from_millis(1),
        )
        .run();

        assert!(matches!(exit, CaptureExit::Failed(_)));
        assert_eq!(rx.drain().len(), 1);
    }

    #[test]
    fn test_capture_waits_for_previous_worker() {
        let (_dir, store) = temp_store("join");
        let sampler = Arc::new(MockSampler::new());
        let (tx, _rx) = dispatch::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let finished = Arc::new(AtomicBool::new(false));
        let previous = {
            let finished = finished.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                finished.store(true, Ordering::SeqCst);
            })
        };

        let session = CaptureSession::new(
            sampler.clone(),
            AppState::default(),
            store,
            tx,
            cancel.clone(),
            Duration::from_millis(1),
        )
        .after(Some(previous));
        let handle = thread::spawn(move || session.run());

        thread::sleep(Duration::from_millis(10));
        assert_eq!(sampler.sample_count(), 0, "sampling started too early");

        thread::sleep(Duration::from_millis(100));
        assert!(finished.load(Ordering::SeqCst));
        assert!(sampler.sample_count() > 0);

        cancel.store(true, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
