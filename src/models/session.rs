use serde::{Deserialize, Serialize};

/// A single meditation countdown.
///
/// `remaining_seconds` never exceeds `total_seconds`, and `running` is always
/// false once `remaining_seconds` reaches zero. The [`SessionController`]
/// is the only thing that mutates a session.
///
/// [`SessionController`]: crate::meditation::SessionController
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeditationSession {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub running: bool,
}

impl MeditationSession {
    /// Create an idle session. A zero duration is raised to one second.
    pub fn new(total_seconds: u32) -> Self {
        let total_seconds = total_seconds.max(1);
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            running: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.running {
            SessionPhase::Running
        } else if self.remaining_seconds == 0 {
            SessionPhase::Completed
        } else if self.remaining_seconds == self.total_seconds {
            SessionPhase::Idle
        } else {
            SessionPhase::Paused
        }
    }
}

/// The lifecycle phase of a countdown, derived from the session fields.
///
/// - `Idle`: full duration remaining, not running
/// - `Running`: ticking down
/// - `Paused`: stopped part-way, remaining time preserved
/// - `Completed`: reached zero; only `reset` leaves this phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Running,
    Paused,
    Completed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// The recognised session lengths offered to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationPreset {
    FiveMinutes,
    TenMinutes,
    FifteenMinutes,
    ThirtyMinutes,
}

impl DurationPreset {
    pub const ALL: [DurationPreset; 4] = [
        Self::FiveMinutes,
        Self::TenMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            Self::FiveMinutes => 5,
            Self::TenMinutes => 10,
            Self::FifteenMinutes => 15,
            Self::ThirtyMinutes => 30,
        }
    }

    pub fn seconds(&self) -> u32 {
        self.minutes() * 60
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.minutes() == minutes)
    }

    pub fn from_seconds(seconds: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.seconds() == seconds)
    }
}

impl Default for DurationPreset {
    fn default() -> Self {
        Self::TenMinutes
    }
}

/// Read-only view of a session for API responses and terminal rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub running: bool,
    pub phase: SessionPhase,
    /// Fraction of the session elapsed, in `[0, 1]`.
    pub progress: f64,
    /// Remaining time as `m:ss`.
    pub clock: String,
    /// Set when the total matches one of the presets.
    pub preset_minutes: Option<u32>,
    /// Countdowns this controller has run to completion.
    pub completed_runs: u32,
}

/// Input for selecting a session length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectDurationInput {
    pub minutes: u32,
}
