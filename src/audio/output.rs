//! Speaker output for rendered cues and the ambience loop.
//!
//! A single audio thread owns the output device for the whole process. It is
//! spawned on the first cue and reused afterwards; the device itself is
//! opened lazily and only reopened when playback reports it is gone.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::OnceLock;

use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, PlayError, Sink, Source};

use super::synth::{render_cue, SAMPLE_RATE_HZ};
use super::CueSink;
use crate::models::Cue;

enum AudioCommand {
    Play(Vec<f32>),
    Ambience(Option<PathBuf>),
    PauseAmbience,
    Volume(f32),
}

static OUTPUT: OnceLock<Option<Sender<AudioCommand>>> = OnceLock::new();

/// Handle to the process-wide audio thread, spawning it on first use.
fn output() -> Option<&'static Sender<AudioCommand>> {
    OUTPUT
        .get_or_init(|| {
            let (tx, rx) = mpsc::channel();
            match std::thread::Builder::new()
                .name("lantern-audio".into())
                .spawn(move || AudioWorker::new().run(rx))
            {
                Ok(_) => Some(tx),
                Err(e) => {
                    tracing::debug!("Audio thread unavailable: {}", e);
                    None
                }
            }
        })
        .as_ref()
}

/// Plays cues on the default output device.
///
/// Sound is best-effort: when no device is available every call is a no-op.
#[derive(Debug, Clone, Default)]
pub struct ToneSynth {
    ambience_path: Option<PathBuf>,
}

impl ToneSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loop the audio file at `path` while a session is running.
    pub fn with_ambience(mut self, path: impl Into<PathBuf>) -> Self {
        self.ambience_path = Some(path.into());
        self
    }

    fn send(&self, command: AudioCommand) {
        if let Some(tx) = output() {
            if tx.send(command).is_err() {
                tracing::debug!("Audio thread has exited, dropping command");
            }
        }
    }
}

impl CueSink for ToneSynth {
    fn play(&self, cue: &Cue) {
        let samples = render_cue(cue, SAMPLE_RATE_HZ);
        if samples.is_empty() {
            return;
        }
        tracing::trace!(kind = ?cue.kind, samples = samples.len(), "Playing cue");
        self.send(AudioCommand::Play(samples));
    }

    fn set_ambience(&self, playing: bool) {
        if playing {
            if self.ambience_path.is_some() {
                self.send(AudioCommand::Ambience(self.ambience_path.clone()));
            }
        } else {
            self.send(AudioCommand::PauseAmbience);
        }
    }

    fn set_volume(&self, gain: f32) {
        self.send(AudioCommand::Volume(gain.clamp(0.0, 1.0)));
    }
}

struct OutputDevice {
    // Dropping the stream closes the device.
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl OutputDevice {
    fn open() -> Option<Self> {
        match OutputStream::try_default() {
            Ok((stream, handle)) => Some(Self {
                _stream: stream,
                handle,
            }),
            Err(e) => {
                tracing::debug!("No audio output device: {}", e);
                None
            }
        }
    }
}

struct AudioWorker {
    device: Option<OutputDevice>,
    ambience: Option<(PathBuf, Sink)>,
    gain: f32,
}

impl AudioWorker {
    fn new() -> Self {
        Self {
            device: None,
            ambience: None,
            gain: 0.5,
        }
    }

    fn run(mut self, rx: Receiver<AudioCommand>) {
        while let Ok(command) = rx.recv() {
            match command {
                AudioCommand::Play(samples) => self.play(samples),
                AudioCommand::Ambience(Some(path)) => self.resume_ambience(path),
                AudioCommand::Ambience(None) => {}
                AudioCommand::PauseAmbience => {
                    if let Some((_, sink)) = &self.ambience {
                        sink.pause();
                    }
                }
                AudioCommand::Volume(gain) => {
                    self.gain = gain;
                    if let Some((_, sink)) = &self.ambience {
                        sink.set_volume(gain);
                    }
                }
            }
        }
    }

    fn device(&mut self) -> Option<&OutputDevice> {
        if self.device.is_none() {
            self.device = OutputDevice::open();
        }
        self.device.as_ref()
    }

    fn play(&mut self, samples: Vec<f32>) {
        if self.gain <= 0.0 {
            return;
        }
        for attempt in 0..2 {
            let gain = self.gain;
            let Some(device) = self.device() else { return };
            let source = SamplesBuffer::new(1, SAMPLE_RATE_HZ, samples.clone()).amplify(gain);
            match device.handle.play_raw(source) {
                Ok(()) => return,
                Err(PlayError::NoDevice) if attempt == 0 => {
                    tracing::debug!("Audio device lost, reopening");
                    self.ambience = None;
                    self.device = None;
                }
                Err(e) => {
                    tracing::debug!("Cue playback failed: {}", e);
                    return;
                }
            }
        }
    }

    fn resume_ambience(&mut self, path: PathBuf) {
        if let Some((current, sink)) = &self.ambience {
            if *current == path {
                sink.play();
                return;
            }
        }

        let gain = self.gain;
        let Some(device) = self.device() else { return };
        match open_loop(&device.handle, &path) {
            Ok(sink) => {
                sink.set_volume(gain);
                self.ambience = Some((path, sink));
            }
            Err(e) => tracing::debug!("Ambience {} unavailable: {}", path.display(), e),
        }
    }
}

fn open_loop(handle: &OutputStreamHandle, path: &Path) -> anyhow::Result<Sink> {
    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))?;
    let sink = Sink::try_new(handle)?;
    sink.append(source.repeat_infinite());
    Ok(sink)
}
