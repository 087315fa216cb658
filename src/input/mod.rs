//! Raw input sampling and key synthesis
//!
//! The platform backend is selected at compile time via `#[cfg(target_os = ...)]`.
//! Everything above this module only sees the [`InputSampler`] and
//! [`KeySynth`] traits.

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "macos")]
pub mod macos;

use crate::constants::TRIGGER_SOURCE_COUNT;
use crate::utils::keycode::{ChordKey, TriggerCode};
use std::sync::Arc;
use thiserror::Error;

/// Failure while querying input device state
#[derive(Debug, Error)]
pub enum SampleError {
    /// The query failed this time; retry after a backoff
    #[error("input query failed: {0}")]
    Query(String),
    /// The sampling primitive itself is gone; the owning loop must stop
    #[error("input sampling unavailable: {0}")]
    Unavailable(String),
}

impl SampleError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SampleError::Unavailable(_))
    }
}

/// Failure while synthesizing a key event
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("failed to press {key}: {reason}")]
    Press { key: ChordKey, reason: String },
    #[error("failed to release {key}: {reason}")]
    Release { key: ChordKey, reason: String },
}

/// Fatal start-up failure of the input backend
#[derive(Debug, Error)]
pub enum InitError {
    #[error("no input backend is available on this platform")]
    Unsupported,
    #[error("input backend failed to start: {0}")]
    Backend(String),
}

/// Polls the current state of trigger sources
pub trait InputSampler: Send + Sync {
    /// Whether `code` is currently held down
    fn is_pressed(&self, code: TriggerCode) -> Result<bool, SampleError>;

    /// State of every candidate source
    fn sample(&self) -> Result<Snapshot, SampleError> {
        let mut snapshot = Snapshot::default();
        for code in TriggerCode::all() {
            snapshot.set(code, self.is_pressed(code)?);
        }
        Ok(snapshot)
    }
}

/// Injects key-down / key-up events
pub trait KeySynth: Send + Sync {
    fn press(&self, key: ChordKey) -> Result<(), SequenceError>;
    fn release(&self, key: ChordKey) -> Result<(), SequenceError>;
}

/// "Is currently active" for every source in `1..=32`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot([bool; TRIGGER_SOURCE_COUNT]);

impl Snapshot {
    /// Snapshot with exactly `codes` held
    pub fn with_pressed(codes: &[TriggerCode]) -> Self {
        let mut snapshot = Self::default();
        for &code in codes {
            snapshot.set(code, true);
        }
        snapshot
    }

    pub fn is_pressed(&self, code: TriggerCode) -> bool {
        self.0[code.index()]
    }

    pub fn set(&mut self, code: TriggerCode, pressed: bool) {
        self.0[code.index()] = pressed;
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Sources that went from released in `previous` to held in `self`
    pub fn just_pressed(&self, previous: &Snapshot) -> Vec<TriggerCode> {
        just_pressed(previous.as_slice(), self.as_slice())
            .into_iter()
            .filter_map(TriggerCode::from_index)
            .collect()
    }

    /// Lowest-numbered source that was just pressed
    pub fn first_just_pressed(&self, previous: &Snapshot) -> Option<TriggerCode> {
        self.0
            .iter()
            .zip(previous.0.iter())
            .position(|(&curr, &prev)| curr && !prev)
            .and_then(TriggerCode::from_index)
    }
}

/// Indices `i` where `previous[i]` is false and `current[i]` is true.
///
/// Only the common prefix of the two slices is compared.
pub fn just_pressed(previous: &[bool], current: &[bool]) -> Vec<usize> {
    previous
        .iter()
        .zip(current)
        .enumerate()
        .filter(|&(_, (&prev, &curr))| curr && !prev)
        .map(|(index, _)| index)
        .collect()
}

/// The sampler/synthesizer pair for this host
#[derive(Clone)]
pub struct InputBackend {
    pub sampler: Arc<dyn InputSampler>,
    pub synth: Arc<dyn KeySynth>,
}

impl InputBackend {
    pub fn new(sampler: Arc<dyn InputSampler>, synth: Arc<dyn KeySynth>) -> Self {
        Self { sampler, synth }
    }

    /// Construct the native backend for the current platform
    pub fn platform() -> Result<Self, InitError> {
        #[cfg(target_os = "windows")]
        {
            let backend = windows::WindowsInput::new();
            let backend = Arc::new(backend);
            Ok(Self::new(backend.clone(), backend))
        }

        #[cfg(target_os = "macos")]
        {
            let backend = Arc::new(macos::MacosInput::new()?);
            Ok(Self::new(backend.clone(), backend))
        }

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            Err(InitError::Unsupported)
        }
    }
}
