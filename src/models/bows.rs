use serde::{Deserialize, Serialize};

/// Current state of the bows counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BowCount {
    pub count: u32,
    pub ceiling: u32,
    /// True once the ceiling has been reached.
    pub completed: bool,
}

/// What a single tap did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TapOutcome {
    /// Counted a bow below the ceiling.
    Counted,
    /// Counted the bow that reached the ceiling.
    Completed,
    /// Already at the ceiling; nothing changed and no cue was played.
    Rejected,
}

/// Response to a tap request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapResponse {
    pub outcome: TapOutcome,
    pub bows: BowCount,
}

/// Input for resetting the counter. Resetting requires explicit confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetBowsInput {
    #[serde(default)]
    pub confirm: bool,
}
