use serde::{Deserialize, Serialize};

/// Oscillator shape for a synthesized tone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaveShape {
    Sine,
    Triangle,
}

/// Parameters for one synthesized tone.
///
/// The tone starts at `start_frequency_hz` and, when `end_frequency_hz` is
/// set, sweeps exponentially towards it over `decay_seconds`. Loudness rises
/// quickly to `peak_gain` and decays exponentially to near silence by
/// `decay_seconds`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ToneRequest {
    pub wave_shape: WaveShape,
    pub start_frequency_hz: f32,
    #[serde(default)]
    pub end_frequency_hz: Option<f32>,
    /// Peak amplitude in `(0, 1]`.
    pub peak_gain: f32,
    pub decay_seconds: f32,
}

impl ToneRequest {
    pub fn sine(frequency_hz: f32, peak_gain: f32, decay_seconds: f32) -> Self {
        Self {
            wave_shape: WaveShape::Sine,
            start_frequency_hz: frequency_hz,
            end_frequency_hz: None,
            peak_gain,
            decay_seconds,
        }
    }

    pub fn sweeping_to(mut self, end_frequency_hz: f32) -> Self {
        self.end_frequency_hz = Some(end_frequency_hz);
        self
    }

    pub fn with_shape(mut self, wave_shape: WaveShape) -> Self {
        self.wave_shape = wave_shape;
        self
    }

    /// Whether the request can be rendered at all.
    pub fn is_valid(&self) -> bool {
        self.decay_seconds > 0.0
            && self.peak_gain > 0.0
            && self.peak_gain <= 1.0
            && self.start_frequency_hz > 0.0
            && self.end_frequency_hz.map_or(true, |f| f > 0.0)
    }
}

/// Which audible signal a cue represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    Bell,
    SingingBowl,
    Moktak,
}

/// A short audible signal: one or more tones mixed together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cue {
    pub kind: CueKind,
    pub partials: Vec<ToneRequest>,
}

impl Cue {
    /// A single resonant bell strike that droops in pitch as it fades.
    pub fn bell() -> Self {
        Self {
            kind: CueKind::Bell,
            partials: vec![ToneRequest::sine(440.0, 0.5, 3.0).sweeping_to(220.0)],
        }
    }

    /// Singing bowl: a low fundamental with two metallic overtones.
    /// Marks the start and the end of a meditation.
    pub fn singing_bowl() -> Self {
        Self {
            kind: CueKind::SingingBowl,
            partials: vec![
                ToneRequest::sine(180.0, 0.6, 4.0),
                ToneRequest::sine(530.0, 0.2, 3.0),
                ToneRequest::sine(890.0, 0.1, 2.5).with_shape(WaveShape::Triangle),
            ],
        }
    }

    /// Wooden fish click played for each bow.
    pub fn moktak() -> Self {
        Self {
            kind: CueKind::Moktak,
            partials: vec![ToneRequest::sine(350.0, 0.4, 0.12)
                .with_shape(WaveShape::Triangle)
                .sweeping_to(100.0)],
        }
    }

    /// Length of the longest partial's decay.
    pub fn decay_seconds(&self) -> f32 {
        self.partials
            .iter()
            .map(|p| p.decay_seconds)
            .fold(0.0, f32::max)
    }
}
