//! HTTP router and handlers.

use crate::app::AppState;
use axum::{
    Router,
    routing::get,
};

pub mod entries;

/// Assemble the HTTP router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/entries",
            get(entries::list_entries).post(entries::create_entry),
        )
        .route("/runs", get(entries::list_runs))
        .route("/facilities", get(entries::list_facilities))
        .with_state(state)
}
