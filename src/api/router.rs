use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let ops = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::prometheus));

    let api = Router::new()
        // Alerts
        .route("/api/alerts", get(handlers::alerts::list).post(handlers::alerts::create))
        .route("/api/alerts/active", get(handlers::alerts::list_active))
        .route("/api/alerts/title-suggestion", get(handlers::alerts::title_suggestion))
        .route("/api/alerts/:id", get(handlers::alerts::detail).delete(handlers::alerts::delete))
        .route("/api/alerts/:id/status", patch(handlers::alerts::update_status))
        .route("/api/alerts/:id/fire", post(handlers::alerts::fire))
        .route("/api/alerts/:id/triggers", get(handlers::alerts::triggers))
        .route(
            "/api/alerts/:id/triggers/:trigger_id",
            patch(handlers::alerts::review_trigger),
        )
        // Screener
        .route("/api/screener/run", post(handlers::screener::run))
        // WebSocket
        .route("/ws", get(handlers::ws::handler));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    ops.merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
