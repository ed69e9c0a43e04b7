//! Domain models for Mind Lantern.
//!
//! # Core Concepts
//!
//! ## Practice State
//!
//! - [`MeditationSession`]: A countdown with its derived [`SessionPhase`].
//!   Lengths are chosen from [`DurationPreset`].
//! - [`BowCount`]: The 108 bows counter and the [`TapOutcome`] of each tap.
//!
//! ## Audio
//!
//! - [`ToneRequest`]: One oscillator with a pitch sweep and a decay envelope.
//! - [`Cue`]: A mix of tone requests (bell, singing bowl, moktak click).
//!
//! ## Conversation and Texts
//!
//! - [`ChatMessage`]: An entry in the counsel transcript.
//! - [`DailyQuote`]: The quote for a calendar day, cached per date.
//! - [`Scripture`]: Static scripture text for the reader.
//!
//! ## Persistence
//!
//! - [`PracticeRecord`] / [`PracticeSummary`]: Completed practices per day.
//! - [`Preferences`]: Volume, mute and default session length.

mod bows;
mod chat;
mod practice;
mod quote;
mod scripture;
mod session;
mod tone;

pub use bows::*;
pub use chat::*;
pub use practice::*;
pub use quote::*;
pub use scripture::*;
pub use session::*;
pub use tone::*;
