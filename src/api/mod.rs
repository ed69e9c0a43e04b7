mod handlers;
mod middleware;
mod state;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use middleware::{RateLimiter, SecurityConfig};
pub use state::{today, AppState};

/// Router without authentication, for local use.
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, SecurityConfig::disabled())
}

/// Router with bearer authentication, rate limiting and CORS taken from
/// `config`. The health check stays open.
pub fn create_router_with_config(state: AppState, config: SecurityConfig) -> Router {
    let mut protected = Router::new()
        // Meditation
        .route("/meditation", get(handlers::get_meditation))
        .route("/meditation/start", post(handlers::start_meditation))
        .route("/meditation/pause", post(handlers::pause_meditation))
        .route("/meditation/reset", post(handlers::reset_meditation))
        .route("/meditation/duration", put(handlers::select_duration))
        // Bows
        .route("/bows", get(handlers::get_bows))
        .route("/bows/tap", post(handlers::tap_bow))
        .route("/bows/reset", post(handlers::reset_bows))
        // Daily quote
        .route("/quote", get(handlers::get_quote))
        // Scriptures
        .route("/scriptures", get(handlers::list_scriptures))
        .route("/scriptures/{id}", get(handlers::get_scripture))
        // Counsel
        .route("/chat/messages", get(handlers::list_messages))
        .route("/chat/messages", post(handlers::send_message))
        .route("/chat/abandon", post(handlers::abandon_message))
        // Preferences and practice log
        .route("/preferences", get(handlers::get_preferences))
        .route("/preferences", put(handlers::update_preferences))
        .route("/practice/today", get(handlers::practice_today))
        .route_layer(from_fn_with_state(
            config.clone(),
            middleware::auth_middleware,
        ));

    if let Some(limiter) = config.rate_limiter.clone() {
        protected = protected.route_layer(from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .with_state(state)
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
        }
        None => CorsLayer::permissive(),
    }
}
