use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{create_event, delete_event, get_events, health_check, update_event};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let events = Router::new()
        .route("/events", get(get_events).post(create_event))
        .route("/events/:id", put(update_event).delete(delete_event))
        .with_state(state);

    with_prefix(events, &config.api_prefix)
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.cors_allowed_origins))
}

fn with_prefix(routes: Router, prefix: &str) -> Router {
    if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    }
}
