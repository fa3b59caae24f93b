use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_token;
use crate::config::ServerConfig;
use crate::handler;
use crate::state::AppState;

/// Build the axum router with all reclog endpoints.
///
/// Write, append, pop and clear sit behind the bearer-token gate.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let guarded = Router::new()
        .route("/api/write/", post(handler::write_handler))
        .route("/api/append/", post(handler::append_handler))
        .route("/api/pop/", post(handler::pop_handler))
        .route("/api/clear/", post(handler::clear_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    let router = Router::new()
        .route("/", get(handler::index_handler))
        .route("/api/help/", get(handler::help_handler))
        .route("/api/health/", get(handler::health_handler))
        .route("/api/read/", post(handler::read_handler))
        .route("/api/latest/", post(handler::latest_handler))
        .merge(guarded)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
