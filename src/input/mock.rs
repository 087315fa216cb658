//! In-memory input backend for tests.
//!
//! [`MockSampler`] reports whatever state the test sets and can be told to
//! fail. [`RecordingSynth`] records every successful key event, tracks which
//! keys are logically held, and supports injected failures so the
//! emergency-release paths can be exercised without touching a real device.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{InputSampler, KeySynth, SampleError, SequenceError, Snapshot};
use crate::utils::keycode::{ChordKey, TriggerCode};

/// Sampler whose state is driven by the test
#[derive(Default)]
pub struct MockSampler {
    state: Mutex<Snapshot>,
    pending_failures: AtomicUsize,
    unavailable: AtomicBool,
    samples: AtomicUsize,
}

impl MockSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, code: TriggerCode) {
        self.state.lock().set(code, true);
    }

    pub fn release(&self, code: TriggerCode) {
        self.state.lock().set(code, false);
    }

    /// The next `count` queries return a transient error
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Every following query returns a fatal error
    pub fn make_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    /// Number of queries answered so far (including failed ones)
    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), SampleError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SampleError::Unavailable("mock device removed".into()));
        }
        let took_failure = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took_failure {
            return Err(SampleError::Query("mock failure".into()));
        }
        Ok(())
    }
}

impl InputSampler for MockSampler {
    fn is_pressed(&self, code: TriggerCode) -> Result<bool, SampleError> {
        self.check_failure()?;
        Ok(self.state.lock().is_pressed(code))
    }

    fn sample(&self) -> Result<Snapshot, SampleError> {
        self.check_failure()?;
        Ok(*self.state.lock())
    }
}

/// One successful synthesized event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthEvent {
    Press(ChordKey),
    Release(ChordKey),
}

/// Synthesizer that records events instead of injecting them
#[derive(Default)]
pub struct RecordingSynth {
    events: Mutex<Vec<SynthEvent>>,
    held: Mutex<HashSet<ChordKey>>,
    failing_presses: Mutex<Vec<(ChordKey, usize)>>,
    failing_releases: Mutex<Vec<(ChordKey, usize)>>,
}

impl RecordingSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next press of `key` fails once
    pub fn fail_next_press(&self, key: ChordKey) {
        self.failing_presses.lock().push((key, 0));
    }

    /// The next release of `key` fails once
    pub fn fail_next_release(&self, key: ChordKey) {
        self.fail_nth_release(key, 0);
    }

    /// Let `skip` releases of `key` succeed, then fail the following one
    pub fn fail_nth_release(&self, key: ChordKey, skip: usize) {
        self.failing_releases.lock().push((key, skip));
    }

    pub fn events(&self) -> Vec<SynthEvent> {
        self.events.lock().clone()
    }

    /// Keys currently logically held down
    pub fn held_keys(&self) -> HashSet<ChordKey> {
        self.held.lock().clone()
    }

    /// Number of successful presses of `key`
    pub fn press_count(&self, key: ChordKey) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| **event == SynthEvent::Press(key))
            .count()
    }

    fn take_failure(list: &Mutex<Vec<(ChordKey, usize)>>, key: ChordKey) -> bool {
        let mut list = list.lock();
        let Some(pos) = list.iter().position(|(k, _)| *k == key) else {
            return false;
        };
        if list[pos].1 == 0 {
            list.remove(pos);
            true
        } else {
            list[pos].1 -= 1;
            false
        }
    }
}

impl KeySynth for RecordingSynth {
    fn press(&self, key: ChordKey) -> Result<(), SequenceError> {
        if Self::take_failure(&self.failing_presses, key) {
            return Err(SequenceError::Press {
                key,
                reason: "mock failure".into(),
            });
        }
        self.held.lock().insert(key);
        self.events.lock().push(SynthEvent::Press(key));
        Ok(())
    }

    fn release(&self, key: ChordKey) -> Result<(), SequenceError> {
        if Self::take_failure(&self.failing_releases, key) {
            return Err(SequenceError::Release {
                key,
                reason: "mock failure".into(),
            });
        }
        self.held.lock().remove(&key);
        self.events.lock().push(SynthEvent::Release(key));
        Ok(())
    }
}
