//! The 108 bows counter.

use crate::audio::CueSink;
use crate::models::{BowCount, Cue, TapOutcome};

/// Number of bows in a full round.
pub const BOW_CEILING: u32 = 108;

/// Asks the user to approve a destructive action.
pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> bool;
}

/// A confirmation decided ahead of time, e.g. by a flag in a request body.
impl Confirmation for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

pub const RESET_PROMPT: &str = "카운트를 초기화하시겠습니까?";

/// Counts bows up to a fixed ceiling, clicking the moktak on each one.
#[derive(Debug, Clone)]
pub struct BowCounter {
    count: u32,
    ceiling: u32,
}

impl Default for BowCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BowCounter {
    pub fn new() -> Self {
        Self::with_ceiling(BOW_CEILING)
    }

    pub fn with_ceiling(ceiling: u32) -> Self {
        Self {
            count: 0,
            ceiling: ceiling.max(1),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_complete(&self) -> bool {
        self.count >= self.ceiling
    }

    /// Count one bow. At the ceiling the tap is rejected silently.
    pub fn tap(&mut self, cues: &dyn CueSink) -> TapOutcome {
        if self.is_complete() {
            return TapOutcome::Rejected;
        }

        self.count += 1;
        cues.play(&Cue::moktak());

        if self.is_complete() {
            tracing::info!(bows = self.count, "Bows round completed");
            TapOutcome::Completed
        } else {
            TapOutcome::Counted
        }
    }

    /// Return to zero if the user confirms. Returns whether the reset happened.
    pub fn reset(&mut self, confirmation: &dyn Confirmation) -> bool {
        if !confirmation.confirm(RESET_PROMPT) {
            return false;
        }
        tracing::debug!(from = self.count, "Bows counter reset");
        self.count = 0;
        true
    }

    pub fn snapshot(&self) -> BowCount {
        BowCount {
            count: self.count,
            ceiling: self.ceiling,
            completed: self.is_complete(),
        }
    }
}
