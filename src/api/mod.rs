//! HTTP API (spec.md §6): `/assess`, `/vitals`, `/ws`.
//!
//! Grounded on the teacher's `api` module shape (a `Clone` state struct,
//! `Router::with_state`, `TraceLayer`/`CorsLayer` middleware) but with
//! response bodies matching spec.md §6's literal JSON shapes directly
//! rather than the teacher's `data`/`meta` envelope.

mod envelope;
mod handlers;
mod routes;

pub use handlers::AppState;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    routes::api_routes(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive())
}
