/// Router Module Index
///
/// Groups the routes by who may call them. Authentication is applied per group with an axum
/// layer in `create_router`; role checks happen inside the handlers, since a rejected role must
/// still produce the JSON error body.

/// Routes accessible without a token: health, registration, login and the catalog.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware, open to every role.
pub mod authenticated;

/// Routes restricted to the 'admin' role.
pub mod admin;

/// Routes restricted to restaurant owners.
pub mod restaurant;

/// Routes restricted to delivery couriers.
pub mod delivery;
