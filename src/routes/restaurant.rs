use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Restaurant Router Module
///
/// Nested under `/restaurant`. Handlers require the 'restaurant' role and ownership of the
/// target restaurant.
pub fn restaurant_routes() -> Router<AppState> {
    Router::new()
        // POST /restaurant/menu
        .route("/menu", post(handlers::add_menu_item))
}
