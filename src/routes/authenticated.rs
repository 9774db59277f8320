use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Authenticated Router Module
///
/// Routes open to any caller holding a valid token. What each caller sees or may change is
/// decided from the `AuthUser` role: order listings are scoped per role, and status changes go
/// through the lifecycle controller.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's own profile.
        .route("/me", get(handlers::get_me))
        // PUT /me/contact
        // Email and phone are the only mutable account fields.
        .route("/me/contact", put(handlers::update_contact))
        // GET/POST /orders
        // Listing is role-scoped. Creation is for customers only; the total is priced
        // server-side from the catalog.
        .route(
            "/orders",
            get(handlers::get_orders).post(handlers::create_order),
        )
        // GET /orders/{id}
        // Orders outside the caller's scope report 404.
        .route("/orders/{id}", get(handlers::get_order))
        // PUT /orders/{id}/status
        // Per-role transitions, including the atomic courier claim (`accepted`).
        .route("/orders/{id}/status", put(handlers::update_order_status))
}
