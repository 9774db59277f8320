use crate::{
    error::AppError,
    models::{
        Account, AccountProfile, AvailableOrder, CreateMenuItemRequest, CreateOrderRequest,
        CreateRestaurantRequest, MenuItem, NewAccount, Order, OrderItemView, OrderScope,
        OrderStatus, OrderView, Restaurant, UpdateContactRequest,
    },
    ordering::{self, from_cents, to_cents},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{
    FromRow, QueryBuilder, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for every persistence operation. Handlers and the lifecycle controller
/// only see this trait, so tests can substitute an in-memory database or a mock.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`) shareable across
/// axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    // Fails with `Conflict` when the username is taken.
    async fn create_account(&self, account: NewAccount) -> Result<Account, AppError>;
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, AppError>;
    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, AppError>;
    async fn list_accounts(&self) -> Result<Vec<AccountProfile>, AppError>;
    // Contact fields only. Uses COALESCE so absent fields are kept.
    async fn update_contact(
        &self,
        id: Uuid,
        req: UpdateContactRequest,
    ) -> Result<Option<AccountProfile>, AppError>;

    // --- Catalog Store ---
    async fn list_active_restaurants(&self) -> Result<Vec<Restaurant>, AppError>;
    async fn get_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, AppError>;
    async fn create_restaurant(&self, req: CreateRestaurantRequest) -> Result<Restaurant, AppError>;
    async fn is_restaurant_owner(&self, restaurant_id: Uuid, owner_id: Uuid)
    -> Result<bool, AppError>;
    async fn get_menu(&self, restaurant_id: Uuid) -> Result<Vec<MenuItem>, AppError>;
    async fn create_menu_item(&self, req: CreateMenuItemRequest) -> Result<MenuItem, AppError>;

    // --- Order Ledger ---
    /// Prices the request against current catalog prices and writes the order with all of its
    /// items in one transaction. Returns the new order id.
    async fn place_order(&self, customer_id: Uuid, req: CreateOrderRequest)
    -> Result<Uuid, AppError>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError>;
    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<OrderView>, AppError>;
    async fn get_order_view(&self, id: Uuid, scope: OrderScope)
    -> Result<Option<OrderView>, AppError>;
    // Unclaimed orders in status `confirmed`.
    async fn list_available_orders(&self) -> Result<Vec<AvailableOrder>, AppError>;

    // --- Status Writes ---
    // Each returns true only if a row was updated.
    async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<bool, AppError>;
    /// Compare-and-set claim: assigns the courier and sets `accepted` only while no courier
    /// is assigned.
    async fn claim_order(&self, id: Uuid, courier_id: Uuid) -> Result<bool, AppError>;
    /// Updates the status only while `courier_id` is the assigned courier.
    async fn set_status_as_courier(
        &self,
        id: Uuid,
        courier_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, AppError>;
    /// Admin override: unconditional status write, optionally reassigning the courier.
    async fn override_order(
        &self,
        id: Uuid,
        status: OrderStatus,
        delivery_guy_id: Option<Uuid>,
    ) -> Result<bool, AppError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

// How long a writer waits for the database lock before reporting SQLITE_BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// connect_pool
///
/// Opens the SQLite pool (creating the database file if needed) and applies `migrations/`.
/// In-memory databases exist per connection, so they are pinned to a single connection that is
/// never recycled.
pub async fn connect_pool(db_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = db_url.contains(":memory:") || db_url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    if !in_memory {
        // Readers keep going while an order or status write holds the lock.
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { max_connections })
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// SqliteRepository
///
/// The concrete implementation of `Repository`, backed by SQLite through an `sqlx` pool.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a new repository over an initialized (and migrated) pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// --- Row Types (money columns are integer cents) ---

#[derive(FromRow)]
struct MenuItemRow {
    id: Uuid,
    restaurant_id: Uuid,
    name: String,
    description: Option<String>,
    price_cents: i64,
    image_url: Option<String>,
    category: Option<String>,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        Self {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            description: row.description,
            price: from_cents(row.price_cents),
            image_url: row.image_url,
            category: row.category,
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    restaurant_id: Uuid,
    delivery_guy_id: Option<Uuid>,
    status: OrderStatus,
    total_cents: i64,
    delivery_address: String,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            restaurant_id: row.restaurant_id,
            delivery_guy_id: row.delivery_guy_id,
            status: row.status,
            total_amount: from_cents(row.total_cents),
            delivery_address: row.delivery_address,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct OrderViewRow {
    #[sqlx(flatten)]
    order: OrderRow,
    restaurant_name: Option<String>,
    customer_name: Option<String>,
}

#[derive(FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    menu_item_id: Uuid,
    name: String,
    quantity: i64,
    price_cents: i64,
}

#[derive(FromRow)]
struct AvailableOrderRow {
    id: Uuid,
    restaurant_name: Option<String>,
    customer_name: Option<String>,
    total_cents: i64,
    delivery_address: String,
    created_at: DateTime<Utc>,
}

const ACCOUNT_COLUMNS: &str =
    "id, username, password_hash, role, name, email, phone, created_at";
const ORDER_COLUMNS: &str = "id, user_id, restaurant_id, delivery_guy_id, status, total_cents, delivery_address, created_at";
const ORDER_VIEW_SELECT: &str = r#"
    SELECT
        o.id, o.user_id, o.restaurant_id, o.delivery_guy_id, o.status,
        o.total_cents, o.delivery_address, o.created_at,
        r.name AS restaurant_name, u.name AS customer_name
    FROM orders o
    LEFT JOIN restaurants r ON o.restaurant_id = r.id
    LEFT JOIN users u ON o.user_id = u.id
    WHERE 1 = 1
"#;

/// Appends the visibility predicate for `scope` to an order query.
fn push_scope(builder: &mut QueryBuilder<'_, Sqlite>, scope: OrderScope) {
    match scope {
        OrderScope::All => {}
        OrderScope::OwnedRestaurants(owner_id) => {
            builder.push(" AND o.restaurant_id IN (SELECT id FROM restaurants WHERE owner_id = ");
            builder.push_bind(owner_id);
            builder.push(")");
        }
        OrderScope::Courier(courier_id) => {
            builder.push(" AND (o.delivery_guy_id = ");
            builder.push_bind(courier_id);
            builder.push(" OR (o.delivery_guy_id IS NULL AND o.status = ");
            builder.push_bind(OrderStatus::Confirmed);
            builder.push("))");
        }
        OrderScope::Customer(customer_id) => {
            builder.push(" AND o.user_id = ");
            builder.push_bind(customer_id);
        }
    }
}

impl SqliteRepository {
    /// Loads the line items of `rows` in one query and assembles the views.
    async fn attach_items(&self, rows: Vec<OrderViewRow>) -> Result<Vec<OrderView>, AppError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT oi.order_id, oi.menu_item_id, mi.name, oi.quantity, oi.price_cents
            FROM order_items oi
            JOIN menu_items mi ON oi.menu_item_id = mi.id
            WHERE oi.order_id IN (
            "#,
        );
        let mut ids = builder.separated(", ");
        for row in &rows {
            ids.push_bind(row.order.id);
        }
        ids.push_unseparated(")");

        let item_rows = builder
            .build_query_as::<OrderItemRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut items: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
        for item in item_rows {
            items.entry(item.order_id).or_default().push(OrderItemView {
                menu_item_id: item.menu_item_id,
                name: item.name,
                quantity: item.quantity,
                price: from_cents(item.price_cents),
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let order = Order::from(row.order);
                OrderView {
                    items: items.remove(&order.id).unwrap_or_default(),
                    id: order.id,
                    user_id: order.user_id,
                    restaurant_id: order.restaurant_id,
                    delivery_guy_id: order.delivery_guy_id,
                    status: order.status,
                    total_amount: order.total_amount,
                    delivery_address: order.delivery_address,
                    created_at: order.created_at,
                    restaurant_name: row.restaurant_name,
                    customer_name: row.customer_name,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    /// create_account
    ///
    /// The UNIQUE constraint on `username` is the arbiter of duplicates, so two concurrent
    /// registrations cannot both succeed.
    async fn create_account(&self, account: NewAccount) -> Result<Account, AppError> {
        let query = format!(
            "INSERT INTO users (id, username, password_hash, role, name, email, phone, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {ACCOUNT_COLUMNS}"
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(account.role)
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.phone)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict("Username already exists".to_string())
                }
                other => AppError::Database(other),
            })
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, AppError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = ?");
        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_accounts(&self) -> Result<Vec<AccountProfile>, AppError> {
        Ok(sqlx::query_as::<_, AccountProfile>(
            "SELECT id, username, role, name, email, phone FROM users ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_contact(
        &self,
        id: Uuid,
        req: UpdateContactRequest,
    ) -> Result<Option<AccountProfile>, AppError> {
        Ok(sqlx::query_as::<_, AccountProfile>(
            r#"
            UPDATE users
            SET email = COALESCE(?, email),
                phone = COALESCE(?, phone)
            WHERE id = ?
            RETURNING id, username, role, name, email, phone
            "#,
        )
        .bind(req.email)
        .bind(req.phone)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    // --- CATALOG ---

    async fn list_active_restaurants(&self) -> Result<Vec<Restaurant>, AppError> {
        Ok(sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, name, description, cuisine_type, address, phone, image_url, owner_id, is_active
            FROM restaurants
            WHERE is_active = 1
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, AppError> {
        Ok(sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, name, description, cuisine_type, address, phone, image_url, owner_id, is_active
            FROM restaurants
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_restaurant(&self, req: CreateRestaurantRequest) -> Result<Restaurant, AppError> {
        Ok(sqlx::query_as::<_, Restaurant>(
            r#"
            INSERT INTO restaurants (id, name, description, cuisine_type, address, phone, image_url, owner_id, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
            RETURNING id, name, description, cuisine_type, address, phone, image_url, owner_id, is_active
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.description)
        .bind(req.cuisine_type)
        .bind(req.address)
        .bind(req.phone)
        .bind(req.image_url)
        .bind(req.owner_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn is_restaurant_owner(
        &self,
        restaurant_id: Uuid,
        owner_id: Uuid,
    ) -> Result<bool, AppError> {
        let found: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM restaurants WHERE id = ? AND owner_id = ?")
                .bind(restaurant_id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn get_menu(&self, restaurant_id: Uuid) -> Result<Vec<MenuItem>, AppError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, restaurant_id, name, description, price_cents, image_url, category
            FROM menu_items
            WHERE restaurant_id = ?
            ORDER BY category ASC, name ASC
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MenuItem::from).collect())
    }

    async fn create_menu_item(&self, req: CreateMenuItemRequest) -> Result<MenuItem, AppError> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            INSERT INTO menu_items (id, restaurant_id, name, description, price_cents, image_url, category)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, restaurant_id, name, description, price_cents, image_url, category
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.restaurant_id)
        .bind(req.name)
        .bind(req.description)
        .bind(to_cents(req.price)?)
        .bind(req.image_url)
        .bind(req.category)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    // --- ORDER LEDGER ---

    /// place_order
    ///
    /// Catalog prices are read inside the same transaction that writes the order, so the total
    /// and the per-item price snapshots always agree. Dropping `tx` on an early return rolls
    /// everything back.
    ///
    /// The transaction takes the write lock up front (`BEGIN IMMEDIATE`). A deferred transaction
    /// would start as a reader and fail with SQLITE_BUSY when upgrading while another order is
    /// being written; an immediate one waits on the busy timeout instead.
    async fn place_order(
        &self,
        customer_id: Uuid,
        req: CreateOrderRequest,
    ) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM restaurants WHERE id = ?")
            .bind(req.restaurant_id)
            .fetch_optional(&mut *tx)
            .await?;
        if active != Some(true) {
            return Err(AppError::Validation(format!(
                "Restaurant {} is not accepting orders",
                req.restaurant_id
            )));
        }

        let prices: Vec<(Uuid, i64)> =
            sqlx::query_as("SELECT id, price_cents FROM menu_items WHERE restaurant_id = ?")
                .bind(req.restaurant_id)
                .fetch_all(&mut *tx)
                .await?;
        let catalog: HashMap<Uuid, Decimal> = prices
            .into_iter()
            .map(|(id, cents)| (id, from_cents(cents)))
            .collect();

        let priced = ordering::price_order(&req.items, &catalog)?;

        let order_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, restaurant_id, status, total_cents, delivery_address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order_id)
        .bind(customer_id)
        .bind(req.restaurant_id)
        .bind(OrderStatus::Pending)
        .bind(to_cents(priced.total)?)
        .bind(&req.delivery_address)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        for line in &priced.lines {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, menu_item_id, quantity, price_cents) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(line.menu_item_id)
            .bind(line.quantity)
            .bind(to_cents(line.unit_price)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order_id)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Order::from))
    }

    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<OrderView>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(ORDER_VIEW_SELECT);
        push_scope(&mut builder, scope);
        builder.push(" ORDER BY o.created_at DESC");

        let rows = builder
            .build_query_as::<OrderViewRow>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_items(rows).await
    }

    async fn get_order_view(
        &self,
        id: Uuid,
        scope: OrderScope,
    ) -> Result<Option<OrderView>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(ORDER_VIEW_SELECT);
        builder.push(" AND o.id = ");
        builder.push_bind(id);
        push_scope(&mut builder, scope);

        let row = builder
            .build_query_as::<OrderViewRow>()
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_available_orders(&self) -> Result<Vec<AvailableOrder>, AppError> {
        let rows = sqlx::query_as::<_, AvailableOrderRow>(
            r#"
            SELECT o.id, r.name AS restaurant_name, u.name AS customer_name,
                   o.total_cents, o.delivery_address, o.created_at
            FROM orders o
            LEFT JOIN restaurants r ON o.restaurant_id = r.id
            LEFT JOIN users u ON o.user_id = u.id
            WHERE o.status = ? AND o.delivery_guy_id IS NULL
            ORDER BY o.created_at DESC
            "#,
        )
        .bind(OrderStatus::Confirmed)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AvailableOrder {
                id: row.id,
                restaurant_name: row.restaurant_name,
                customer_name: row.customer_name,
                total_amount: from_cents(row.total_cents),
                delivery_address: row.delivery_address,
                created_at: row.created_at,
            })
            .collect())
    }

    // --- STATUS WRITES ---

    async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// claim_order
    ///
    /// A single conditional UPDATE: the `delivery_guy_id IS NULL` predicate is evaluated by the
    /// database under its write lock, so of two concurrent claims exactly one affects a row.
    async fn claim_order(&self, id: Uuid, courier_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE orders SET delivery_guy_id = ?, status = ? WHERE id = ? AND delivery_guy_id IS NULL",
        )
        .bind(courier_id)
        .bind(OrderStatus::Accepted)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_status_as_courier(
        &self,
        id: Uuid,
        courier_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND delivery_guy_id = ?")
                .bind(status)
                .bind(id)
                .bind(courier_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn override_order(
        &self,
        id: Uuid,
        status: OrderStatus,
        delivery_guy_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let result = match delivery_guy_id {
            Some(courier_id) => {
                sqlx::query("UPDATE orders SET delivery_guy_id = ?, status = ? WHERE id = ?")
                    .bind(courier_id)
                    .bind(status)
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
                    .bind(status)
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }
}
