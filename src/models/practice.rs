use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::DurationPreset;

/// The kind of practice a record was logged for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PracticeKind {
    Meditation,
    Bows,
}

impl PracticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meditation => "meditation",
            Self::Bows => "bows",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "meditation" => Some(Self::Meditation),
            "bows" => Some(Self::Bows),
            _ => None,
        }
    }
}

/// A completed practice: a finished countdown or a full round of bows.
///
/// `amount` is seconds for meditation and bows for bows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeRecord {
    pub id: Uuid,
    pub kind: PracticeKind,
    pub amount: u32,
    /// Local calendar date the practice was completed on.
    pub practice_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
}

/// Totals for a single day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PracticeSummary {
    pub date: NaiveDate,
    pub meditations_completed: u32,
    pub meditation_seconds: u32,
    pub bow_rounds: u32,
}

/// User-adjustable preferences, persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    /// Master volume, `0..=100`.
    pub volume: u8,
    pub muted: bool,
    /// Session length selected when the app starts. Travels as minutes,
    /// the same unit `UpdatePreferencesInput` takes.
    #[serde(rename = "default_minutes", with = "preset_minutes")]
    pub default_preset: DurationPreset,
}

mod preset_minutes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::DurationPreset;

    pub fn serialize<S: Serializer>(preset: &DurationPreset, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(preset.minutes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DurationPreset, D::Error> {
        let minutes = u32::deserialize(d)?;
        DurationPreset::from_minutes(minutes)
            .ok_or_else(|| de::Error::custom(format!("{} minutes is not a session preset", minutes)))
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            volume: 50,
            muted: false,
            default_preset: DurationPreset::default(),
        }
    }
}

impl Preferences {
    /// Effective output gain in `[0, 1]`.
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            f32::from(self.volume.min(100)) / 100.0
        }
    }
}

/// Input for updating preferences. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePreferencesInput {
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    /// Default session length in minutes; must be one of the presets.
    pub default_minutes: Option<u32>,
}
