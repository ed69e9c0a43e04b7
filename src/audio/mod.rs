//! Audible cues for practice events.
//!
//! Everything that wants to make a sound goes through [`CueSink`]. Sound is
//! an enhancement only: sinks never report failure to their callers.

mod output;
pub mod synth;

use std::sync::Mutex;

use crate::models::{Cue, CueKind};

pub use output::ToneSynth;

/// Destination for cues and the ambience loop.
pub trait CueSink: Send + Sync {
    /// Play a cue. Must not block for the duration of the sound.
    fn play(&self, cue: &Cue);

    /// Start (or resume) and pause the background ambience.
    fn set_ambience(&self, _playing: bool) {}

    /// Master gain in `[0, 1]`.
    fn set_volume(&self, _gain: f32) {}
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl CueSink for SilentSink {
    fn play(&self, _cue: &Cue) {}
}

/// A sink that remembers what it was asked to play.
///
/// Used headless and in tests to observe cue timing without a speaker.
#[derive(Debug, Default)]
pub struct RecordingSink {
    cues: Mutex<Vec<CueKind>>,
    ambience: Mutex<Vec<bool>>,
    volume: Mutex<Option<f32>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<CueKind> {
        self.cues.lock().expect("recording lock poisoned").clone()
    }

    pub fn count(&self, kind: CueKind) -> usize {
        self.played().into_iter().filter(|k| *k == kind).count()
    }

    /// Every ambience transition requested, in order.
    pub fn ambience_changes(&self) -> Vec<bool> {
        self.ambience.lock().expect("recording lock poisoned").clone()
    }

    pub fn volume(&self) -> Option<f32> {
        *self.volume.lock().expect("recording lock poisoned")
    }
}

impl CueSink for RecordingSink {
    fn play(&self, cue: &Cue) {
        self.cues.lock().expect("recording lock poisoned").push(cue.kind);
    }

    fn set_ambience(&self, playing: bool) {
        self.ambience
            .lock()
            .expect("recording lock poisoned")
            .push(playing);
    }

    fn set_volume(&self, gain: f32) {
        *self.volume.lock().expect("recording lock poisoned") = Some(gain);
    }
}
