//! Meditation countdown.
//!
//! [`SessionController`] is the single source of truth for a countdown. It
//! is driven by a [`Ticker`] and reports start and completion through a
//! [`CueSink`].
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --start--> Running
//!                    |                                    |
//!                    +-------- remaining hits 0 ----------+--> Completed --reset--> Idle
//! ```

pub mod progress;
pub mod ticker;

use std::sync::Arc;

use crate::audio::CueSink;
use crate::models::{Cue, DurationPreset, MeditationSession, SessionPhase, SessionSnapshot};

pub use ticker::{IntervalTicker, ManualTicker, TickHandler, Ticker};

/// Result of delivering one tick to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session was not running or the tick came from a stopped source.
    Ignored,
    /// One second elapsed.
    Ticked { remaining: u32 },
    /// The countdown reached zero on this tick.
    Completed,
}

/// Owns one countdown and its tick source.
///
/// Dropping the controller stops the ticker.
pub struct SessionController {
    session: MeditationSession,
    ticker: Box<dyn Ticker>,
    cues: Arc<dyn CueSink>,
    epoch: u64,
    completed_runs: u32,
}

impl SessionController {
    pub fn new(total_seconds: u32, ticker: Box<dyn Ticker>, cues: Arc<dyn CueSink>) -> Self {
        Self {
            session: MeditationSession::new(total_seconds),
            ticker,
            cues,
            epoch: 0,
            completed_runs: 0,
        }
    }

    pub fn with_preset(
        preset: DurationPreset,
        ticker: Box<dyn Ticker>,
        cues: Arc<dyn CueSink>,
    ) -> Self {
        Self::new(preset.seconds(), ticker, cues)
    }

    pub fn session(&self) -> MeditationSession {
        self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn is_running(&self) -> bool {
        self.session.running
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.session.remaining_seconds
    }

    pub fn total_seconds(&self) -> u32 {
        self.session.total_seconds
    }

    pub fn completed_runs(&self) -> u32 {
        self.completed_runs
    }

    /// Whether the tick source is currently live.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_active()
    }

    /// The epoch opened by the most recent `start`.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Set the session length.
    ///
    /// Ignored while running and for a zero duration. Otherwise the remaining
    /// time is reset to the new total. Returns whether the change applied.
    pub fn configure(&mut self, duration_seconds: u32) -> bool {
        if duration_seconds == 0 {
            tracing::debug!("Ignoring zero session duration");
            return false;
        }
        if self.session.running {
            tracing::debug!("Ignoring duration change while running");
            return false;
        }
        self.session.total_seconds = duration_seconds;
        self.session.remaining_seconds = duration_seconds;
        true
    }

    pub fn select_preset(&mut self, preset: DurationPreset) -> bool {
        self.configure(preset.seconds())
    }

    /// Begin or resume the countdown.
    ///
    /// A start from the full duration rings the opening bowl; a resume does
    /// not. No-op while running or once the countdown has reached zero.
    pub fn start(&mut self) -> bool {
        if self.session.running || self.session.remaining_seconds == 0 {
            return false;
        }

        let fresh = self.session.remaining_seconds == self.session.total_seconds;
        self.session.running = true;
        self.epoch += 1;
        self.ticker.start(self.epoch);

        if fresh {
            self.cues.play(&Cue::singing_bowl());
        }
        self.cues.set_ambience(true);

        tracing::info!(
            remaining = self.session.remaining_seconds,
            epoch = self.epoch,
            "Meditation {}",
            if fresh { "started" } else { "resumed" }
        );
        true
    }

    /// Stop ticking and keep the remaining time.
    pub fn pause(&mut self) {
        if !self.session.running {
            return;
        }
        self.halt();
        tracing::info!(remaining = self.session.remaining_seconds, "Meditation paused");
    }

    /// Stop ticking and restore the full duration.
    pub fn reset(&mut self) {
        if self.session.running {
            self.halt();
        }
        self.session.remaining_seconds = self.session.total_seconds;
        tracing::debug!(total = self.session.total_seconds, "Meditation reset");
    }

    /// Deliver a tick for the current epoch.
    pub fn tick(&mut self) -> TickOutcome {
        self.tick_for(self.epoch)
    }

    /// Deliver a tick that was scheduled for `epoch`.
    ///
    /// Ticks for any other epoch come from a source that has since been
    /// stopped and are ignored.
    pub fn tick_for(&mut self, epoch: u64) -> TickOutcome {
        if !self.session.running || epoch != self.epoch {
            return TickOutcome::Ignored;
        }

        self.session.remaining_seconds = self.session.remaining_seconds.saturating_sub(1);
        if self.session.remaining_seconds > 0 {
            return TickOutcome::Ticked {
                remaining: self.session.remaining_seconds,
            };
        }

        self.halt();
        self.completed_runs += 1;
        self.cues.play(&Cue::singing_bowl());
        tracing::info!(
            total = self.session.total_seconds,
            runs = self.completed_runs,
            "Meditation completed"
        );
        TickOutcome::Completed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let s = self.session;
        SessionSnapshot {
            total_seconds: s.total_seconds,
            remaining_seconds: s.remaining_seconds,
            running: s.running,
            phase: s.phase(),
            progress: progress::project(s.remaining_seconds, s.total_seconds),
            clock: progress::format_clock(s.remaining_seconds),
            preset_minutes: DurationPreset::from_seconds(s.total_seconds).map(|p| p.minutes()),
            completed_runs: self.completed_runs,
        }
    }

    fn halt(&mut self) {
        self.session.running = false;
        self.ticker.stop();
        self.cues.set_ambience(false);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.ticker.stop();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("epoch", &self.epoch)
            .field("completed_runs", &self.completed_runs)
            .finish()
    }
}
