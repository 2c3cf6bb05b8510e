//! Route table (spec.md §6): `/assess`, `/vitals`, `/ws`, `/alerts/:patient_id`.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, AppState};

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/assess", post(handlers::assess))
        .route("/vitals", post(handlers::vitals))
        .route("/alerts/:patient_id", get(handlers::recent_alerts))
        .route("/ws", get(handlers::progress_ws))
        .with_state(state)
}
