//! The daily quote, generated once per calendar date.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::counsel::{ChatRequest, ChatService};
use crate::db::Database;
use crate::models::{DailyQuote, QuoteOrigin};

pub const QUOTE_PROMPT: &str = "불교 경전이나 큰스님들의 말씀 중에서 하루를 시작하기 좋은 짧고 감동적인 명언 하나를 추천해줘. 출처도 함께 명시해줘. 형식: \"명언\" - 출처";

/// Shown when no API key is configured or the model returns nothing.
pub const DEFAULT_QUOTE: &str = "\"마음이 모든 것이다. 당신이 생각하는 대로 된다.\" - 붓다";

/// Shown when the service fails.
pub const ERROR_QUOTE: &str = "\"오늘 하루도 자비로운 마음으로 살아가십시오.\" - 마음의 등불";

/// Serves the quote of the day, asking the model at most once per date.
#[derive(Clone)]
pub struct QuoteKeeper {
    db: Database,
    service: Option<Arc<dyn ChatService>>,
    /// Held while asking the model so concurrent callers share one request.
    generating: Arc<Mutex<()>>,
}

impl QuoteKeeper {
    pub fn new(db: Database, service: Option<Arc<dyn ChatService>>) -> Self {
        Self {
            db,
            service,
            generating: Arc::new(Mutex::new(())),
        }
    }

    /// The quote for `date`. Never fails; fallbacks are not cached so the
    /// next call tries the service again.
    pub async fn today(&self, date: NaiveDate) -> DailyQuote {
        if let Some(quote) = self.cached(date) {
            return quote;
        }

        let Some(service) = &self.service else {
            return parse_quote(date, DEFAULT_QUOTE, QuoteOrigin::Fallback);
        };

        let _generating = self.generating.lock().await;
        // Another caller may have filled the cache while we waited.
        if let Some(quote) = self.cached(date) {
            return quote;
        }

        let raw = match service.generate(ChatRequest::prompt(QUOTE_PROMPT)).await {
            Ok(raw) if !raw.trim().is_empty() => raw,
            Ok(_) => return parse_quote(date, DEFAULT_QUOTE, QuoteOrigin::Fallback),
            Err(e) => {
                tracing::error!("Daily quote request failed: {}", e);
                return parse_quote(date, ERROR_QUOTE, QuoteOrigin::Fallback);
            }
        };

        let quote = parse_quote(date, &raw, QuoteOrigin::Generated);
        if let Err(e) = self.db.cache_quote(&quote) {
            tracing::warn!("Failed to cache daily quote: {:#}", e);
        }
        tracing::info!(%date, "Generated daily quote");
        quote
    }

    fn cached(&self, date: NaiveDate) -> Option<DailyQuote> {
        match self.db.get_cached_quote(date) {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!("Failed to read quote cache: {:#}", e);
                None
            }
        }
    }
}

/// Strip quotation marks and split a trailing `- source` into the author.
pub fn parse_quote(date: NaiveDate, raw: &str, origin: QuoteOrigin) -> DailyQuote {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '“' | '”'))
        .collect();
    let cleaned = cleaned.trim();

    let (text, author) = match cleaned.rsplit_once(" - ") {
        Some((text, author)) if !text.trim().is_empty() && !author.trim().is_empty() => {
            (text.trim().to_string(), Some(author.trim().to_string()))
        }
        _ => (cleaned.to_string(), None),
    };

    DailyQuote {
        date,
        text,
        author,
        origin,
    }
}
