use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{ApiJson, ApiPath, AppError, required},
    lifecycle,
    models::{
        AccountProfile, AuthResponse, AvailableOrder, CreateMenuItemRequest, CreateOrderRequest,
        CreateRestaurantRequest, CreatedResponse, LoginRequest, MenuItem, NewAccount, Order,
        OrderCreatedResponse, OrderView, RegisterRequest, Restaurant, Role, UpdateContactRequest,
        UpdateStatusRequest, UserSummary,
    },
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use uuid::Uuid;

// Optional text inputs: blank means absent.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates an account and returns a token for it.
///
/// *Validation*: username, password, role and name are required. The username must be unused,
/// otherwise the request fails with 409.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let username = required("username", &payload.username)?;
    let name = required("name", &payload.name)?;
    if payload.password.is_empty() {
        return Err(AppError::Validation(
            "Missing required field: password".to_string(),
        ));
    }

    let account = state
        .repo
        .create_account(NewAccount {
            username,
            password_hash: auth::hash_password(&payload.password)?,
            role: payload.role,
            name,
            email: optional(payload.email),
            phone: optional(payload.phone),
        })
        .await?;

    tracing::info!(account_id = %account.id, role = %account.role, "account registered");

    let token = auth::issue_token(&state.config, account.id, account.role)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserSummary::from(&account),
        }),
    ))
}

/// login
///
/// [Public Route] Exchanges a username and password for a token. Unknown usernames and wrong
/// passwords get the same 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let username = required("username", &payload.username)?;
    if payload.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password required".to_string(),
        ));
    }

    let account = state
        .repo
        .find_account_by_username(&username)
        .await?
        .filter(|account| auth::verify_password(&payload.password, &account.password_hash))
        .ok_or_else(|| AppError::Unauthenticated("Invalid credentials".to_string()))?;

    let token = auth::issue_token(&state.config, account.id, account.role)?;
    Ok(Json(AuthResponse {
        token,
        user: UserSummary::from(&account),
    }))
}

/// get_me
///
/// [Authenticated Route] The caller's own account profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = AccountProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AccountProfile>, AppError> {
    state
        .repo
        .get_account(id)
        .await?
        .map(|account| Json(AccountProfile::from(account)))
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
}

/// update_contact
///
/// [Authenticated Route] Updates the caller's email and/or phone. Every other account field is
/// immutable.
#[utoipa::path(
    put,
    path = "/me/contact",
    request_body = UpdateContactRequest,
    responses((status = 200, description = "Updated", body = AccountProfile))
)]
pub async fn update_contact(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateContactRequest>,
) -> Result<Json<AccountProfile>, AppError> {
    let req = UpdateContactRequest {
        email: optional(payload.email),
        phone: optional(payload.phone),
    };

    state
        .repo
        .update_contact(id, req)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
}

// --- Catalog Handlers ---

/// get_restaurants
///
/// [Public Route] Lists active restaurants.
#[utoipa::path(
    get,
    path = "/restaurants",
    responses((status = 200, description = "Active restaurants", body = [Restaurant]))
)]
pub async fn get_restaurants(
    State(state): State<AppState>,
) -> Result<Json<Vec<Restaurant>>, AppError> {
    Ok(Json(state.repo.list_active_restaurants().await?))
}

/// get_menu
///
/// [Public Route] Lists a restaurant's menu items. Unknown restaurants have an empty menu.
#[utoipa::path(
    get,
    path = "/restaurants/{id}/menu",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses((status = 200, description = "Menu", body = [MenuItem]))
)]
pub async fn get_menu(
    State(state): State<AppState>,
    ApiPath(restaurant_id): ApiPath<Uuid>,
) -> Result<Json<Vec<MenuItem>>, AppError> {
    Ok(Json(state.repo.get_menu(restaurant_id).await?))
}

// --- Order Handlers ---

/// create_order
///
/// [Authenticated Route] Places an order for the calling customer. Only the `customer` role may
/// order; a valid token of any other role gets 403.
///
/// *Pricing*: the total is computed from current catalog prices; any price the client sends is
/// ignored. The order and its items are written atomically.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderCreatedResponse),
        (status = 400, description = "Missing fields or unknown menu items"),
        (status = 403, description = "Not a customer")
    )
)]
pub async fn create_order(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), AppError> {
    user.require_role(&[Role::Customer])?;

    let delivery_address = required("delivery_address", &payload.delivery_address)?;
    let req = CreateOrderRequest {
        delivery_address,
        ..payload
    };
    let restaurant_id = req.restaurant_id;

    let order_id = state.repo.place_order(user.id, req).await?;
    tracing::info!(%order_id, customer = %user.id, %restaurant_id, "order placed");

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            message: "Order created".to_string(),
            order_id,
        }),
    ))
}

/// get_orders
///
/// [Authenticated Route] Lists the orders visible to the caller, newest first, each with its
/// line items. Visibility depends on role (see `lifecycle::visibility_scope`).
#[utoipa::path(
    get,
    path = "/orders",
    responses((status = 200, description = "Visible orders", body = [OrderView]))
)]
pub async fn get_orders(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    let scope = lifecycle::visibility_scope(&user);
    Ok(Json(state.repo.list_orders(scope).await?))
}

/// get_order
///
/// [Authenticated Route] A single order, if the caller may see it. Orders outside the caller's
/// scope are reported as 404, not 403.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Found", body = OrderView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_order(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let scope = lifecycle::visibility_scope(&user);
    state
        .repo
        .get_order_view(id, scope)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// update_order_status
///
/// [Authenticated Route] Moves an order to a new status, subject to the per-role rules of the
/// lifecycle controller.
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Order),
        (status = 403, description = "Transition not allowed for this caller"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order already claimed")
    )
)]
pub async fn update_order_status(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = lifecycle::update_status(state.repo.as_ref(), user, id, payload).await?;
    Ok(Json(order))
}

// --- Role-Restricted Handlers ---

/// get_admin_users
///
/// [Admin Route] Lists every account.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [AccountProfile]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountProfile>>, AppError> {
    user.require_role(&[Role::Admin])?;
    Ok(Json(state.repo.list_accounts().await?))
}

/// create_restaurant
///
/// [Admin Route] Adds an active restaurant. When `owner_id` is given it must name an account
/// with the `restaurant` role.
#[utoipa::path(
    post,
    path = "/admin/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = CreatedResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_restaurant(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateRestaurantRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    user.require_role(&[Role::Admin])?;

    if let Some(owner_id) = payload.owner_id {
        match state.repo.get_account(owner_id).await? {
            Some(owner) if owner.role == Role::Restaurant => {}
            _ => {
                return Err(AppError::Validation(format!(
                    "Account {owner_id} is not a restaurant owner"
                )));
            }
        }
    }

    let req = CreateRestaurantRequest {
        name: required("name", &payload.name)?,
        description: optional(payload.description),
        cuisine_type: optional(payload.cuisine_type),
        address: optional(payload.address),
        phone: optional(payload.phone),
        image_url: optional(payload.image_url),
        owner_id: payload.owner_id,
    };

    let restaurant = state.repo.create_restaurant(req).await?;
    tracing::info!(restaurant_id = %restaurant.id, "restaurant created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Restaurant created".to_string(),
            id: restaurant.id,
        }),
    ))
}

/// add_menu_item
///
/// [Restaurant Route] Adds an item to a restaurant the caller owns.
#[utoipa::path(
    post,
    path = "/restaurant/menu",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Menu item added", body = CreatedResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not your restaurant"),
        (status = 404, description = "Restaurant not found")
    )
)]
pub async fn add_menu_item(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    user.require_role(&[Role::Restaurant])?;

    let restaurant = state
        .repo
        .get_restaurant(payload.restaurant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".to_string()))?;
    if restaurant.owner_id != Some(user.id) {
        return Err(AppError::Forbidden("Not your restaurant".to_string()));
    }

    let req = CreateMenuItemRequest {
        name: required("name", &payload.name)?,
        description: optional(payload.description),
        image_url: optional(payload.image_url),
        category: optional(payload.category),
        ..payload
    };

    let item = state.repo.create_menu_item(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Menu item added".to_string(),
            id: item.id,
        }),
    ))
}

/// get_available_orders
///
/// [Delivery Route] The pool of confirmed orders no courier has claimed yet.
#[utoipa::path(
    get,
    path = "/delivery/available",
    responses(
        (status = 200, description = "Unclaimed confirmed orders", body = [AvailableOrder]),
        (status = 403, description = "Not a courier")
    )
)]
pub async fn get_available_orders(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AvailableOrder>>, AppError> {
    user.require_role(&[Role::Delivery])?;
    Ok(Json(state.repo.list_available_orders().await?))
}
