use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token: the gateway functions (register, login) and read-only catalog
/// browsing. Only active restaurants are listed.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // Creates an account with the chosen role and returns a token for it.
        .route("/auth/register", post(handlers::register))
        // POST /auth/login
        // Exchanges username and password for a 24h bearer token.
        .route("/auth/login", post(handlers::login))
        // GET /restaurants
        .route("/restaurants", get(handlers::get_restaurants))
        // GET /restaurants/{id}/menu
        .route("/restaurants/{id}/menu", get(handlers::get_menu))
}
