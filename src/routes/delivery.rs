use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Delivery Router Module
///
/// Nested under `/delivery`. Handlers require the 'delivery' role.
pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        // GET /delivery/available
        // Confirmed orders no courier has claimed yet. Claiming goes through
        // PUT /orders/{id}/status with `accepted`.
        .route("/available", get(handlers::get_available_orders))
}
