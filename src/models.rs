use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Closed Vocabularies ---

/// Role
///
/// The four account roles. Every authorization decision matches on this exhaustively, so a new
/// role cannot silently fall through to another role's permissions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    Restaurant,
    Delivery,
    Customer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Restaurant => "restaurant",
            Role::Delivery => "delivery",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OrderStatus
///
/// Every status an order can hold. Orders start in `Pending`; which status a caller may move
/// an order to is decided by the lifecycle controller, not by this type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Rejected,
    Preparing,
    Ready,
    Accepted,
    PickedUp,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Accepted => "accepted",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Credential Store ---

/// Account
///
/// Full row of the `users` table, including the password hash. Never serialized; handlers
/// respond with `AccountProfile` or `UserSummary` instead.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// AccountProfile
///
/// Public view of an account (GET /admin/users, GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct AccountProfile {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<Account> for AccountProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            role: account.role,
            name: account.name,
            email: account.email,
            phone: account.phone,
        }
    }
}

/// UserSummary
///
/// The `user` object embedded in register/login responses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub name: String,
}

impl From<&Account> for UserSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            role: account.role,
            name: account.name.clone(),
        }
    }
}

/// NewAccount
///
/// Validated registration data with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// --- Catalog Store ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cuisine_type: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    // The restaurant-role account that manages this restaurant.
    pub owner_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MenuItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "number")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

// --- Order Ledger ---

/// Order
///
/// A row of the `orders` table. `total_amount` is fixed at creation from catalog prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    // The ordering customer.
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    // The courier that claimed the order, if any.
    pub delivery_guy_id: Option<Uuid>,
    pub status: OrderStatus,
    #[ts(type = "number")]
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub delivery_address: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// OrderItemView
///
/// A line item as shown to clients: the menu item's name with the quantity and the price
/// captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OrderItemView {
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: i64,
    #[ts(type = "number")]
    #[schema(value_type = f64)]
    pub price: Decimal,
}

/// OrderView
///
/// An order joined with its restaurant and customer names, embedding its line items
/// (GET /orders, GET /orders/{id}).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub delivery_guy_id: Option<Uuid>,
    pub status: OrderStatus,
    #[ts(type = "number")]
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub delivery_address: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub restaurant_name: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<OrderItemView>,
}

/// AvailableOrder
///
/// Row of the courier's available pool (GET /delivery/available).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AvailableOrder {
    pub id: Uuid,
    pub restaurant_name: Option<String>,
    pub customer_name: Option<String>,
    #[ts(type = "number")]
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub delivery_address: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// OrderScope
///
/// The slice of the Order Ledger a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Every order (admin).
    All,
    /// Orders of restaurants owned by this account.
    OwnedRestaurants(Uuid),
    /// Orders assigned to this courier, plus unclaimed confirmed orders.
    Courier(Uuid),
    /// Orders placed by this customer.
    Customer(Uuid),
}

/// PricedLine
///
/// An order line after pricing against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub menu_item_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// PricedOrder
///
/// Everything needed to persist a new order: lines with catalog prices and their total.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /auth/register.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// UpdateContactRequest
///
/// Partial update of an account's contact fields (PUT /me/contact). Absent fields are kept.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateContactRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateRestaurantRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateMenuItemRequest {
    pub restaurant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[ts(type = "number")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// OrderLineRequest
///
/// One requested line. Any client-side price sent alongside is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OrderLineRequest {
    pub menu_item_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateOrderRequest {
    pub restaurant_id: Uuid,
    pub items: Vec<OrderLineRequest>,
    pub delivery_address: String,
}

/// UpdateStatusRequest
///
/// Input payload for PUT /orders/{id}/status. `delivery_guy_id` is only honoured for admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub delivery_guy_id: Option<Uuid>,
}

// --- Response Payloads (Output Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatedResponse {
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OrderCreatedResponse {
    pub message: String,
    pub order_id: Uuid,
}
