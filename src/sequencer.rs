//! Key Sequencer: emits the Space+Shift chord with fixed relative timing
//!
//! The sequence is:
//! release both → press Space → wait d → press Shift → wait d →
//! release Space → wait d/2 → release Shift → wait d/2.
//!
//! `d` is computed by the caller (speed and calibration already applied);
//! the sequencer only executes the timing.

use crate::input::{KeySynth, SequenceError};
use crate::utils::keycode::ChordKey;
use log::{debug, warn};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// The two chord keys, in press order
pub const CHORD: [ChordKey; 2] = [ChordKey::Space, ChordKey::Shift];

/// Executes chords on a [`KeySynth`]
#[derive(Clone)]
pub struct KeySequencer {
    synth: Arc<dyn KeySynth>,
}

impl KeySequencer {
    pub fn new(synth: Arc<dyn KeySynth>) -> Self {
        Self { synth }
    }

    /// Emit one chord with step delay `delay`.
    ///
    /// On any failure both keys are released before the error is returned,
    /// so a failed chord never leaves a key held down.
    pub fn emit_chord(&self, delay: Duration) -> Result<(), SequenceError> {
        let [first, second] = CHORD;
        let half = delay / 2;

        let result = (|| {
            // Clear anything a previous chord may have left behind
            self.release_both()?;

            self.synth.press(first)?;
            debug!("{} pressed", first);
            thread::sleep(delay);

            self.synth.press(second)?;
            debug!("{} pressed", second);
            thread::sleep(delay);

            self.synth.release(first)?;
            debug!("{} released", first);
            thread::sleep(half);

            self.synth.release(second)?;
            debug!("{} released", second);
            thread::sleep(half);
            Ok(())
        })();

        if let Err(ref e) = result {
            warn!("Key sequence failed: {}", e);
            self.emergency_release();
        } else {
            debug!("Sequence complete ({:?} step delay)", delay);
        }
        result
    }

    /// Release both chord keys, attempting both even if the first fails
    pub fn release_both(&self) -> Result<(), SequenceError> {
        let mut first_err = None;
        for key in CHORD {
            if let Err(e) = self.synth.release(key) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Best-effort release used after a failure; errors are only logged
    pub fn emergency_release(&self) {
        for key in CHORD {
            if let Err(e) = self.synth.release(key) {
                warn!("Emergency release of {} failed: {}", key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::mock::{RecordingSynth, SynthEvent};

    fn sequencer() -> (Arc<RecordingSynth>, KeySequencer) {
        let synth = Arc::new(RecordingSynth::new());
        let sequencer = KeySequencer::new(synth.clone());
        (synth, sequencer)
    }

    #[test]
    fn test_chord_event_order() {
        let (synth, sequencer) = sequencer();
        sequencer.emit_chord(Duration::from_millis(1)).unwrap();

        assert_eq!(
            synth.events(),
            vec![
                SynthEvent::Release(ChordKey::Space),
                SynthEvent::Release(ChordKey::Shift),
                SynthEvent::Press(ChordKey::Space),
                SynthEvent::Press(ChordKey::Shift),
                SynthEvent::Release(ChordKey::Space),
                SynthEvent::Release(ChordKey::Shift),
            ]
        );
        assert!(synth.held_keys().is_empty());
    }

    #[test]
    fn test_chord_timing_is_two_and_a_half_steps() {
        let (_synth, sequencer) = sequencer();
        let start = std::time::Instant::now();
        sequencer.emit_chord(Duration::from_millis(20)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_failed_press_releases_held_key() {
        let (synth, sequencer) = sequencer();
        synth.fail_next_press(ChordKey::Shift);

        let result = sequencer.emit_chord(Duration::from_millis(1));

        assert!(matches!(
            result,
            Err(SequenceError::Press {
                key: ChordKey::Shift,
                ..
            })
        ));
        assert!(synth.held_keys().is_empty(), "Space must not stay held");
    }

    #[test]
    fn test_failed_release_is_retried_by_emergency_release() {
        let (synth, sequencer) = sequencer();

        // Pre-clear succeeds, then the release of Space inside the chord fails
        synth.fail_nth_release(ChordKey::Space, 1);
        let result = sequencer.emit_chord(Duration::from_millis(1));

        assert!(matches!(
            result,
            Err(SequenceError::Release {
                key: ChordKey::Space,
                ..
            })
        ));
        assert!(synth.held_keys().is_empty());
    }

    #[test]
    fn test_chord_after_failure_leaves_nothing_held() {
        let (synth, sequencer) = sequencer();
        sequencer.emit_chord(Duration::from_millis(1)).unwrap();

        synth.fail_next_press(ChordKey::Space);
        assert!(sequencer.emit_chord(Duration::from_millis(1)).is_err());
        assert!(synth.held_keys().is_empty());

        sequencer.emit_chord(Duration::from_millis(1)).unwrap();
        assert!(synth.held_keys().is_empty());
        assert_eq!(synth.press_count(ChordKey::Space), 2);
    }

    #[test]
    fn test_release_both_attempts_every_key() {
        let (synth, sequencer) = sequencer();
        synth.press(ChordKey::Shift).unwrap();
        synth.fail_next_release(ChordKey::Space);

        assert!(sequencer.release_both().is_err());
        assert!(!synth.held_keys().contains(&ChordKey::Shift));
    }
}
