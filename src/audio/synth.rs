//! Procedural tone rendering.

use std::f32::consts::TAU;
use std::time::Duration;

use crate::models::{Cue, ToneRequest, WaveShape};

/// Output sample rate used for every rendered cue.
pub const SAMPLE_RATE_HZ: u32 = 44_100;

/// Silence appended after the longest decay before the voice is released.
pub const RELEASE_MARGIN_SECONDS: f32 = 0.05;

/// Level the envelope decays to by `decay_seconds`.
const DECAY_FLOOR: f32 = 0.001;

const MAX_ATTACK_SECONDS: f32 = 0.05;

/// Render a cue to mono `f32` samples at `sample_rate`.
///
/// Partials are summed and the mix is clamped to `[-1, 1]`. Invalid partials
/// are skipped. The buffer covers the longest decay plus the release margin.
pub fn render_cue(cue: &Cue, sample_rate: u32) -> Vec<f32> {
    let length = buffer_len(cue.decay_seconds(), sample_rate);
    let mut mix = vec![0.0f32; length];

    for partial in cue.partials.iter().filter(|p| p.is_valid()) {
        render_into(&mut mix, partial, sample_rate);
    }

    for sample in &mut mix {
        *sample = sample.clamp(-1.0, 1.0);
    }
    mix
}

/// How long a cue sounds once playback starts, release margin included.
pub fn cue_duration(cue: &Cue) -> Duration {
    let decay = cue.decay_seconds();
    if decay <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f32(decay + RELEASE_MARGIN_SECONDS)
}

/// Render a single tone request.
pub fn render_tone(request: &ToneRequest, sample_rate: u32) -> Vec<f32> {
    let mut buffer = vec![0.0f32; buffer_len(request.decay_seconds, sample_rate)];
    if request.is_valid() {
        render_into(&mut buffer, request, sample_rate);
    }
    buffer
}

fn buffer_len(decay_seconds: f32, sample_rate: u32) -> usize {
    if decay_seconds <= 0.0 {
        return 0;
    }
    ((decay_seconds + RELEASE_MARGIN_SECONDS) * sample_rate as f32).ceil() as usize
}

fn render_into(buffer: &mut [f32], request: &ToneRequest, sample_rate: u32) {
    let rate = sample_rate as f32;
    let mut phase = 0.0f32;

    for (i, out) in buffer.iter_mut().enumerate() {
        let t = i as f32 / rate;
        let frequency = frequency_at(request, t);
        *out += oscillator(request.wave_shape, phase) * envelope(request, t);
        phase = (phase + frequency / rate).fract();
    }
}

/// Instantaneous frequency: exponential sweep towards the end frequency,
/// held once the decay is over.
pub fn frequency_at(request: &ToneRequest, t: f32) -> f32 {
    match request.end_frequency_hz {
        Some(end) => {
            let progress = (t / request.decay_seconds).clamp(0.0, 1.0);
            request.start_frequency_hz * (end / request.start_frequency_hz).powf(progress)
        }
        None => request.start_frequency_hz,
    }
}

/// Gain at time `t`: linear attack, then exponential decay to the floor.
pub fn envelope(request: &ToneRequest, t: f32) -> f32 {
    let attack = (request.decay_seconds / 10.0).min(MAX_ATTACK_SECONDS);
    if t < attack {
        return request.peak_gain * (t / attack);
    }
    if t >= request.decay_seconds {
        return 0.0;
    }

    let floor_ratio = DECAY_FLOOR / request.peak_gain;
    let progress = (t - attack) / (request.decay_seconds - attack);
    request.peak_gain * floor_ratio.powf(progress)
}

/// One period of the waveform; `phase` is in `[0, 1)`.
fn oscillator(shape: WaveShape, phase: f32) -> f32 {
    match shape {
        WaveShape::Sine => (phase * TAU).sin(),
        WaveShape::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CueKind;

    const RATE: u32 = 8_000;

    #[test]
    fn buffer_covers_decay_plus_margin() {
        let samples = render_cue(&Cue::moktak(), RATE);
        let expected = ((0.12 + RELEASE_MARGIN_SECONDS) * RATE as f32).ceil() as usize;
        assert_eq!(samples.len(), expected);
    }

    #[test]
    fn cue_duration_matches_the_rendered_buffer() {
        let bowl = Cue::singing_bowl();
        let seconds = cue_duration(&bowl).as_secs_f32();
        assert!((seconds - (4.0 + RELEASE_MARGIN_SECONDS)).abs() < 1e-3);

        let samples = render_cue(&bowl, RATE).len() as f32 / RATE as f32;
        assert!((samples - seconds).abs() < 1e-3);

        let silent = Cue { kind: CueKind::Bell, partials: vec![] };
        assert_eq!(cue_duration(&silent), Duration::ZERO);
    }

    #[test]
    fn never_exceeds_peak_gain() {
        let request = ToneRequest::sine(440.0, 0.3, 0.5);
        let samples = render_tone(&request, RATE);
        assert!(samples.iter().all(|s| s.abs() <= 0.3 + 1e-4));
    }

    #[test]
    fn fades_to_silence_by_decay_end() {
        let request = ToneRequest::sine(220.0, 0.8, 1.0);
        let samples = render_tone(&request, RATE);
        let tail = &samples[RATE as usize..];
        assert!(tail.iter().all(|s| *s == 0.0));
        let late = &samples[(RATE as f32 * 0.95) as usize..RATE as usize];
        assert!(late.iter().all(|s| s.abs() < 0.01));
    }

    #[test]
    fn envelope_rises_then_decays() {
        let request = ToneRequest::sine(440.0, 0.5, 2.0);
        assert_eq!(envelope(&request, 0.0), 0.0);
        let peak = envelope(&request, 0.05);
        assert!((peak - 0.5).abs() < 1e-3);
        assert!(envelope(&request, 1.0) < peak);
        assert!(envelope(&request, 1.9) < envelope(&request, 1.0));
    }

    #[test]
    fn sweep_reaches_end_frequency() {
        let request = ToneRequest::sine(350.0, 0.4, 0.12).sweeping_to(100.0);
        assert!((frequency_at(&request, 0.0) - 350.0).abs() < 1e-3);
        assert!((frequency_at(&request, 0.12) - 100.0).abs() < 1e-2);
        assert!((frequency_at(&request, 5.0) - 100.0).abs() < 1e-2);
    }

    #[test]
    fn mixed_partials_stay_in_range() {
        let samples = render_cue(&Cue::singing_bowl(), RATE);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(samples.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn invalid_partials_render_silence() {
        let cue = Cue {
            kind: crate::models::CueKind::Bell,
            partials: vec![ToneRequest::sine(440.0, 2.0, 0.2)],
        };
        assert!(render_cue(&cue, RATE).iter().all(|s| *s == 0.0));
    }
}
