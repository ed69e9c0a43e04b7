use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::state::{today, AppState};
use crate::counsel::TranscriptError;
use crate::models::*;
use crate::scripture;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side, clients only see a generic message.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn transcript_error(e: TranscriptError) -> (StatusCode, String) {
    let status = match e {
        TranscriptError::Busy => StatusCode::CONFLICT,
        TranscriptError::EmptyMessage => StatusCode::BAD_REQUEST,
        TranscriptError::Superseded => StatusCode::GONE,
    };
    (status, e.to_string())
}

fn not_a_preset(minutes: u32) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        format!("{} minutes is not a session preset (5, 10, 15 or 30)", minutes),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Meditation
// ============================================================

pub async fn get_meditation(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let controller = state.meditation.lock().expect("meditation lock poisoned");
    Json(controller.snapshot())
}

pub async fn start_meditation(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let mut controller = state.meditation.lock().expect("meditation lock poisoned");
    controller.start();
    Json(controller.snapshot())
}

pub async fn pause_meditation(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let mut controller = state.meditation.lock().expect("meditation lock poisoned");
    controller.pause();
    Json(controller.snapshot())
}

pub async fn reset_meditation(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let mut controller = state.meditation.lock().expect("meditation lock poisoned");
    controller.reset();
    Json(controller.snapshot())
}

/// Choose a preset length. Ignored while the countdown runs.
pub async fn select_duration(
    State(state): State<AppState>,
    Json(input): Json<SelectDurationInput>,
) -> Result<Json<SessionSnapshot>, (StatusCode, String)> {
    let preset =
        DurationPreset::from_minutes(input.minutes).ok_or_else(|| not_a_preset(input.minutes))?;
    let mut controller = state.meditation.lock().expect("meditation lock poisoned");
    controller.select_preset(preset);
    Ok(Json(controller.snapshot()))
}

// ============================================================
// Bows
// ============================================================

pub async fn get_bows(State(state): State<AppState>) -> Json<BowCount> {
    let bows = state.bows.lock().expect("bows lock poisoned");
    Json(bows.snapshot())
}

pub async fn tap_bow(
    State(state): State<AppState>,
) -> Result<Json<TapResponse>, (StatusCode, String)> {
    let (outcome, bows) = {
        let mut counter = state.bows.lock().expect("bows lock poisoned");
        let outcome = counter.tap(state.cues.as_ref());
        (outcome, counter.snapshot())
    };

    if outcome == TapOutcome::Completed {
        state
            .db
            .record_practice(PracticeKind::Bows, bows.count, today())
            .map_err(internal_error)?;
    }

    Ok(Json(TapResponse { outcome, bows }))
}

/// Reset only when the body carries `"confirm": true`.
pub async fn reset_bows(
    State(state): State<AppState>,
    Json(input): Json<ResetBowsInput>,
) -> Json<BowCount> {
    let mut counter = state.bows.lock().expect("bows lock poisoned");
    counter.reset(&input.confirm);
    Json(counter.snapshot())
}

// ============================================================
// Daily quote
// ============================================================

pub async fn get_quote(State(state): State<AppState>) -> Json<DailyQuote> {
    Json(state.quotes.today(today()).await)
}

// ============================================================
// Scriptures
// ============================================================

pub async fn list_scriptures() -> Json<Vec<ScriptureSummary>> {
    Json(scripture::summaries())
}

pub async fn get_scripture(
    Path(id): Path<String>,
) -> Result<Json<Scripture>, (StatusCode, String)> {
    scripture::find(&id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Scripture not found".to_string()))
}

// ============================================================
// Counsel
// ============================================================

pub async fn list_messages(State(state): State<AppState>) -> Json<Vec<ChatMessage>> {
    Json(state.counselor.messages())
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(input): Json<SendMessageInput>,
) -> Result<(StatusCode, Json<ChatMessage>), (StatusCode, String)> {
    state
        .counselor
        .ask(&input.text)
        .await
        .map(|reply| (StatusCode::CREATED, Json(reply)))
        .map_err(transcript_error)
}

pub async fn abandon_message(State(state): State<AppState>) -> StatusCode {
    state.counselor.abandon();
    StatusCode::NO_CONTENT
}

// ============================================================
// Preferences
// ============================================================

pub async fn get_preferences(
    State(state): State<AppState>,
) -> Result<Json<Preferences>, (StatusCode, String)> {
    state.db.get_preferences().map(Json).map_err(internal_error)
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Json(input): Json<UpdatePreferencesInput>,
) -> Result<Json<Preferences>, (StatusCode, String)> {
    if let Some(minutes) = input.default_minutes {
        if DurationPreset::from_minutes(minutes).is_none() {
            return Err(not_a_preset(minutes));
        }
    }

    let prefs = state.db.update_preferences(input).map_err(internal_error)?;
    state.cues.set_volume(prefs.gain());
    Ok(Json(prefs))
}

// ============================================================
// Practice log
// ============================================================

pub async fn practice_today(
    State(state): State<AppState>,
) -> Result<Json<PracticeSummary>, (StatusCode, String)> {
    state
        .db
        .practice_summary(today())
        .map(Json)
        .map_err(internal_error)
}
