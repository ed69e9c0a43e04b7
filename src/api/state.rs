use std::sync::{Arc, Mutex, Weak};

use anyhow::Result;

use crate::audio::CueSink;
use crate::bows::BowCounter;
use crate::counsel::{ChatService, ChatSession, Counselor, MONK_INSTRUCTION};
use crate::db::Database;
use crate::meditation::{IntervalTicker, SessionController, TickHandler, TickOutcome};
use crate::models::PracticeKind;
use crate::wisdom::QuoteKeeper;

/// Everything the handlers share.
///
/// The meditation controller is ticked by a background interval task that
/// only holds a weak reference, so it never keeps a dropped state alive.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub meditation: Arc<Mutex<SessionController>>,
    pub bows: Arc<Mutex<BowCounter>>,
    pub counselor: Arc<Counselor>,
    pub quotes: QuoteKeeper,
    pub cues: Arc<dyn CueSink>,
}

impl AppState {
    /// Build the state, applying stored preferences to the controller and
    /// the audio output.
    pub fn new(
        db: Database,
        cues: Arc<dyn CueSink>,
        service: Option<Arc<dyn ChatService>>,
    ) -> Result<Self> {
        let prefs = db.get_preferences()?;
        cues.set_volume(prefs.gain());

        let meditation = Arc::new_cyclic(|weak: &Weak<Mutex<SessionController>>| {
            let ticker = IntervalTicker::every_second(tick_handler(weak.clone(), db.clone()));
            Mutex::new(SessionController::with_preset(
                prefs.default_preset,
                Box::new(ticker),
                cues.clone(),
            ))
        });

        let counselor = Counselor::new(ChatSession::open(service.clone(), MONK_INSTRUCTION));

        Ok(Self {
            quotes: QuoteKeeper::new(db.clone(), service),
            db,
            meditation,
            bows: Arc::new(Mutex::new(BowCounter::new())),
            counselor: Arc::new(counselor),
            cues,
        })
    }
}

/// Tick the controller and log a completed countdown as practice.
fn tick_handler(controller: Weak<Mutex<SessionController>>, db: Database) -> TickHandler {
    Arc::new(move |epoch| {
        let Some(controller) = controller.upgrade() else {
            return;
        };
        let mut controller = controller.lock().expect("meditation lock poisoned");
        if controller.tick_for(epoch) == TickOutcome::Completed {
            let seconds = controller.total_seconds();
            if let Err(e) = db.record_practice(PracticeKind::Meditation, seconds, today()) {
                tracing::error!("Failed to record meditation: {:#}", e);
            }
        }
    })
}

/// The user's local calendar date.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
