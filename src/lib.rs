use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod ordering;
pub mod repository;

// Routing segregation (public, authenticated, per role).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, delivery, public, restaurant};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{RepositoryState, SqliteRepository, connect_pool};

/// ApiDoc
///
/// The OpenAPI document for every handler decorated with `#[utoipa::path]`, served at
/// `/api-docs/openapi.json` with a Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::get_me, handlers::update_contact,
        handlers::get_restaurants, handlers::get_menu, handlers::create_order,
        handlers::get_orders, handlers::get_order, handlers::update_order_status,
        handlers::get_admin_users, handlers::create_restaurant, handlers::add_menu_item,
        handlers::get_available_orders
    ),
    components(
        schemas(
            models::Role, models::OrderStatus, models::AccountProfile, models::UserSummary,
            models::Restaurant, models::MenuItem, models::Order, models::OrderView,
            models::OrderItemView, models::AvailableOrder, models::RegisterRequest,
            models::LoginRequest, models::UpdateContactRequest, models::CreateRestaurantRequest,
            models::CreateMenuItemRequest, models::OrderLineRequest, models::CreateOrderRequest,
            models::UpdateStatusRequest, models::AuthResponse, models::CreatedResponse,
            models::OrderCreatedResponse,
        )
    ),
    tags(
        (name = "food-delivery", description = "Food Delivery Marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The shared, cloneable container of everything a handler needs: the persistence layer and
/// the loaded configuration (which carries the token secret).
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: all database access goes through this trait object.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects requests without a valid bearer token before they reach a protected handler.
/// Extraction of `AuthUser` does the work: on failure the extractor answers 401 itself.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the full routing tree, applies the authentication layer to every protected group
/// and wraps everything in the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Role-restricted groups. The role itself is checked inside each handler.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .nest(
            "/restaurant",
            restaurant::restaurant_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .nest(
            "/delivery",
            delivery::delivery_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // Generates a UUID request id for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echoes the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with method, URI and the `x-request-id` header so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
