use serde::{Deserialize, Serialize};

/// A scripture available in the reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scripture {
    pub id: String,
    pub title: String,
    pub short_description: String,
    /// Full text, lines separated by `\n`.
    pub content: String,
}

/// Listing entry without the full text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptureSummary {
    pub id: String,
    pub title: String,
    pub short_description: String,
}

impl From<&Scripture> for ScriptureSummary {
    fn from(s: &Scripture) -> Self {
        Self {
            id: s.id.clone(),
            title: s.title.clone(),
            short_description: s.short_description.clone(),
        }
    }
}
