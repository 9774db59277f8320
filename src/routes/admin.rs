use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Nested under `/admin` behind the authentication layer. Every handler checks for the
/// 'admin' role itself.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Lists every account, without password hashes.
        .route("/users", get(handlers::get_admin_users))
        // POST /admin/restaurants
        // Adds an active restaurant, optionally assigning it to a restaurant-role owner.
        .route("/restaurants", post(handlers::create_restaurant))
}
