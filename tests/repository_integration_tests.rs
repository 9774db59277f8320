use axum::http::StatusCode;
use food_delivery::{
    connect_pool,
    models::{
        Account, CreateMenuItemRequest, CreateOrderRequest, CreateRestaurantRequest, MenuItem,
        NewAccount, OrderLineRequest, OrderScope, OrderStatus, Restaurant, Role,
        UpdateContactRequest,
    },
    repository::{Repository, SqliteRepository},
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

// --- Fixtures ---

async fn repo() -> Arc<SqliteRepository> {
    let pool = connect_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");
    Arc::new(SqliteRepository::new(pool))
}

/// A database file behind a multi-connection pool, so concurrent tasks contend for the SQLite
/// write lock. The directory is deleted when the returned `TempDir` drops.
async fn file_repo() -> (TempDir, Arc<SqliteRepository>) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("marketplace.db").display());
    let pool = connect_pool(&url, 8)
        .await
        .expect("Failed to open file database");
    (dir, Arc::new(SqliteRepository::new(pool)))
}

async fn account(repo: &SqliteRepository, username: &str, role: Role) -> Account {
    repo.create_account(NewAccount {
        username: username.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        role,
        name: format!("{username} name"),
        email: None,
        phone: None,
    })
    .await
    .expect("create_account")
}

async fn restaurant(repo: &SqliteRepository, name: &str, owner: Option<Uuid>) -> Restaurant {
    repo.create_restaurant(CreateRestaurantRequest {
        name: name.to_string(),
        owner_id: owner,
        ..Default::default()
    })
    .await
    .expect("create_restaurant")
}

async fn menu_item(
    repo: &SqliteRepository,
    restaurant_id: Uuid,
    name: &str,
    price: rust_decimal::Decimal,
) -> MenuItem {
    repo.create_menu_item(CreateMenuItemRequest {
        restaurant_id,
        name: name.to_string(),
        description: None,
        price,
        image_url: None,
        category: Some("mains".to_string()),
    })
    .await
    .expect("create_menu_item")
}

fn order_request(restaurant_id: Uuid, lines: &[(Uuid, i64)]) -> CreateOrderRequest {
    CreateOrderRequest {
        restaurant_id,
        items: lines
            .iter()
            .map(|&(menu_item_id, quantity)| OrderLineRequest {
                menu_item_id,
                quantity,
            })
            .collect(),
        delivery_address: "1 Main St".to_string(),
    }
}

/// A restaurant with one owner, one menu item (12.99), one customer and one pending order.
struct Marketplace {
    owner: Account,
    customer: Account,
    restaurant: Restaurant,
    burger: MenuItem,
    order_id: Uuid,
}

async fn marketplace(repo: &SqliteRepository) -> Marketplace {
    let owner = account(repo, "owner", Role::Restaurant).await;
    let customer = account(repo, "customer", Role::Customer).await;
    let restaurant = restaurant(repo, "Burger Barn", Some(owner.id)).await;
    let burger = menu_item(repo, restaurant.id, "Burger", dec!(12.99)).await;
    let order_id = repo
        .place_order(customer.id, order_request(restaurant.id, &[(burger.id, 2)]))
        .await
        .expect("place_order");

    Marketplace {
        owner,
        customer,
        restaurant,
        burger,
        order_id,
    }
}

// --- Credential Store ---

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let repo = repo().await;
    account(&repo, "alice", Role::Customer).await;

    let err = repo
        .create_account(NewAccount {
            username: "alice".to_string(),
            password_hash: "x".to_string(),
            role: Role::Admin,
            name: "Other Alice".to_string(),
            email: None,
            phone: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    assert_eq!(repo.list_accounts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_account_lookup_roundtrip() {
    let repo = repo().await;
    let created = account(&repo, "bob", Role::Delivery).await;

    let by_name = repo.find_account_by_username("bob").await.unwrap().unwrap();
    assert_eq!(by_name.id, created.id);
    assert_eq!(by_name.role, Role::Delivery);

    assert!(repo.find_account_by_username("nobody").await.unwrap().is_none());
    assert!(repo.get_account(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_contact_keeps_absent_fields() {
    let repo = repo().await;
    let created = account(&repo, "carol", Role::Customer).await;

    repo.update_contact(
        created.id,
        UpdateContactRequest {
            email: Some("carol@example.com".to_string()),
            phone: Some("555-0100".to_string()),
        },
    )
    .await
    .unwrap();

    let updated = repo
        .update_contact(
            created.id,
            UpdateContactRequest {
                email: None,
                phone: Some("555-0199".to_string()),
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.email.as_deref(), Some("carol@example.com"));
    assert_eq!(updated.phone.as_deref(), Some("555-0199"));
    assert_eq!(updated.username, "carol");
    assert_eq!(updated.role, Role::Customer);
}

// --- Catalog Store ---

#[tokio::test]
async fn test_catalog_lists_active_restaurants_and_menu() {
    let repo = repo().await;
    let owner = account(&repo, "owner", Role::Restaurant).await;
    let r = restaurant(&repo, "Noodle Nook", Some(owner.id)).await;
    menu_item(&repo, r.id, "Ramen", dec!(11.50)).await;

    let listed = repo.list_active_restaurants().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_active);
    assert_eq!(listed[0].owner_id, Some(owner.id));

    let menu = repo.get_menu(r.id).await.unwrap();
    assert_eq!(menu.len(), 1);
    assert_eq!(menu[0].price, dec!(11.50));

    assert!(repo.get_menu(Uuid::new_v4()).await.unwrap().is_empty());
    assert!(repo.is_restaurant_owner(r.id, owner.id).await.unwrap());
    assert!(!repo.is_restaurant_owner(r.id, Uuid::new_v4()).await.unwrap());
}

// --- Order Creation ---

#[tokio::test]
async fn test_place_order_prices_from_catalog() {
    let repo = repo().await;
    let m = marketplace(&repo).await;

    let order = repo.get_order(m.order_id).await.unwrap().unwrap();
    assert_eq!(order.total_amount, dec!(25.98));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.user_id, m.customer.id);
    assert!(order.delivery_guy_id.is_none());

    let view = repo
        .get_order_view(m.order_id, OrderScope::All)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].name, "Burger");
    assert_eq!(view.items[0].quantity, 2);
    assert_eq!(view.items[0].price, dec!(12.99));
    assert_eq!(view.restaurant_name.as_deref(), Some("Burger Barn"));
    assert_eq!(view.customer_name.as_deref(), Some("customer name"));
}

#[tokio::test]
async fn test_item_price_snapshot_survives_catalog_change() {
    let pool = connect_pool("sqlite::memory:", 1).await.unwrap();
    let repo = SqliteRepository::new(pool.clone());
    let m = marketplace(&repo).await;

    sqlx::query("UPDATE menu_items SET price_cents = 1500 WHERE id = ?")
        .bind(m.burger.id)
        .execute(&pool)
        .await
        .unwrap();

    let view = repo
        .get_order_view(m.order_id, OrderScope::All)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.items[0].price, dec!(12.99));
    assert_eq!(view.total_amount, dec!(25.98));
    assert_eq!(repo.get_menu(m.restaurant.id).await.unwrap()[0].price, dec!(15.00));
}

#[tokio::test]
async fn test_order_with_foreign_menu_item_is_rejected_without_writes() {
    let repo = repo().await;
    let m = marketplace(&repo).await;
    let other = restaurant(&repo, "Elsewhere", None).await;
    let foreign = menu_item(&repo, other.id, "Taco", dec!(4.00)).await;

    let err = repo
        .place_order(
            m.customer.id,
            order_request(m.restaurant.id, &[(m.burger.id, 1), (foreign.id, 1)]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    // Only the fixture order exists.
    assert_eq!(repo.list_orders(OrderScope::All).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_for_unknown_restaurant_is_rejected() {
    let repo = repo().await;
    let m = marketplace(&repo).await;

    let err = repo
        .place_order(
            m.customer.id,
            order_request(Uuid::new_v4(), &[(m.burger.id, 1)]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_all_commit() {
    let (_dir, repo) = file_repo().await;
    let m = marketplace(&repo).await;

    let mut customers = vec![];
    for i in 0..32 {
        customers.push(account(&repo, &format!("hungry-{i}"), Role::Customer).await.id);
    }

    let handles: Vec<_> = customers
        .iter()
        .enumerate()
        .map(|(i, &customer_id)| {
            let repo = repo.clone();
            let request = order_request(m.restaurant.id, &[(m.burger.id, (i % 3 + 1) as i64)]);
            tokio::spawn(async move { repo.place_order(customer_id, request).await })
        })
        .collect();

    for handle in handles {
        handle
            .await
            .unwrap()
            .expect("every concurrent order commits");
    }

    // 32 new orders plus the one the fixture placed.
    assert_eq!(repo.list_orders(OrderScope::All).await.unwrap().len(), 33);
    for (i, &customer_id) in customers.iter().enumerate() {
        let orders = repo
            .list_orders(OrderScope::Customer(customer_id))
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        let quantity = rust_decimal::Decimal::from(i % 3 + 1);
        assert_eq!(orders[0].total_amount, dec!(12.99) * quantity);
        assert_eq!(orders[0].items.len(), 1);
    }
}


// --- Visibility ---

#[tokio::test]
async fn test_scopes_isolate_orders() {
    let repo = repo().await;
    let m = marketplace(&repo).await;
    let other_customer = account(&repo, "dave", Role::Customer).await;
    let other_owner = account(&repo, "rival", Role::Restaurant).await;
    let courier = account(&repo, "courier", Role::Delivery).await;

    let mine = repo
        .list_orders(OrderScope::Customer(m.customer.id))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].items.len(), 1);

    assert!(
        repo.list_orders(OrderScope::Customer(other_customer.id))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        repo.list_orders(OrderScope::OwnedRestaurants(m.owner.id))
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(
        repo.list_orders(OrderScope::OwnedRestaurants(other_owner.id))
            .await
            .unwrap()
            .is_empty()
    );
    // Pending orders are not in the courier pool.
    assert!(
        repo.list_orders(OrderScope::Courier(courier.id))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        repo.get_order_view(m.order_id, OrderScope::Customer(other_customer.id))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_courier_sees_pool_and_own_assignments_only() {
    let repo = repo().await;
    let m = marketplace(&repo).await;
    let courier = account(&repo, "courier", Role::Delivery).await;
    let rival = account(&repo, "rival-courier", Role::Delivery).await;

    repo.set_status(m.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let pool = repo.list_available_orders().await.unwrap();
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].total_amount, dec!(25.98));
    assert_eq!(
        repo.list_orders(OrderScope::Courier(courier.id))
            .await
            .unwrap()
            .len(),
        1
    );

    assert!(repo.claim_order(m.order_id, rival.id).await.unwrap());

    assert!(repo.list_available_orders().await.unwrap().is_empty());
    assert!(
        repo.list_orders(OrderScope::Courier(courier.id))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        repo.list_orders(OrderScope::Courier(rival.id))
            .await
            .unwrap()
            .len(),
        1
    );
}

// --- Status Writes ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_have_one_winner() {
    let (_dir, repo) = file_repo().await;
    let m = marketplace(&repo).await;
    repo.set_status(m.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let mut couriers = vec![];
    for i in 0..8 {
        couriers.push(account(&repo, &format!("courier-{i}"), Role::Delivery).await.id);
    }

    let handles: Vec<_> = couriers
        .iter()
        .map(|&courier_id| {
            let repo = repo.clone();
            let order_id = m.order_id;
            tokio::spawn(async move { (courier_id, repo.claim_order(order_id, courier_id).await) })
        })
        .collect();

    let mut winners = vec![];
    for handle in handles {
        let (courier_id, result) = handle.await.unwrap();
        if result.unwrap() {
            winners.push(courier_id);
        }
    }

    assert_eq!(winners.len(), 1);
    let order = repo.get_order(m.order_id).await.unwrap().unwrap();
    assert_eq!(order.delivery_guy_id, Some(winners[0]));
    assert_eq!(order.status, OrderStatus::Accepted);
}

#[tokio::test]
async fn test_courier_write_requires_assignment() {
    let repo = repo().await;
    let m = marketplace(&repo).await;
    let courier = account(&repo, "courier", Role::Delivery).await;
    let stranger = account(&repo, "stranger", Role::Delivery).await;

    repo.set_status(m.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert!(repo.claim_order(m.order_id, courier.id).await.unwrap());

    let before = repo.get_order(m.order_id).await.unwrap().unwrap();
    assert!(
        !repo
            .set_status_as_courier(m.order_id, stranger.id, OrderStatus::Delivered)
            .await
            .unwrap()
    );
    assert_eq!(repo.get_order(m.order_id).await.unwrap().unwrap(), before);

    assert!(
        repo.set_status_as_courier(m.order_id, courier.id, OrderStatus::PickedUp)
            .await
            .unwrap()
    );
    let after = repo.get_order(m.order_id).await.unwrap().unwrap();
    assert_eq!(after.status, OrderStatus::PickedUp);
    // Only the status moved.
    assert_eq!(
        after,
        food_delivery::models::Order {
            status: OrderStatus::PickedUp,
            ..before
        }
    );
}

#[tokio::test]
async fn test_admin_override_reassigns_courier() {
    let repo = repo().await;
    let m = marketplace(&repo).await;
    let courier = account(&repo, "courier", Role::Delivery).await;

    assert!(
        repo.override_order(m.order_id, OrderStatus::Accepted, Some(courier.id))
            .await
            .unwrap()
    );
    let order = repo.get_order(m.order_id).await.unwrap().unwrap();
    assert_eq!(order.delivery_guy_id, Some(courier.id));

    assert!(
        repo.override_order(m.order_id, OrderStatus::Delivered, None)
            .await
            .unwrap()
    );
    let order = repo.get_order(m.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(order.delivery_guy_id, Some(courier.id));

    assert!(
        !repo
            .set_status(Uuid::new_v4(), OrderStatus::Ready)
            .await
            .unwrap()
    );
}
