use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The quote shown for a given calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyQuote {
    pub date: NaiveDate,
    pub text: String,
    /// Attribution parsed from a trailing `- source` suffix.
    pub author: Option<String>,
    pub origin: QuoteOrigin,
}

/// Where a daily quote came from.
///
/// - `Generated`: freshly produced by the language model
/// - `Cached`: reused from earlier the same day
/// - `Fallback`: fixed text used when the service is unavailable
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuoteOrigin {
    Generated,
    Cached,
    Fallback,
}
