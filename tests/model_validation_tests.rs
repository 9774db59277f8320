use axum::http::StatusCode;
use food_delivery::{
    models::{CreateOrderRequest, OrderStatus, RegisterRequest, Role, UpdateStatusRequest},
    ordering::{from_cents, price_order, to_cents},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use uuid::Uuid;

// --- Wire Vocabulary ---

#[test]
fn test_status_wire_names() {
    let json = serde_json::to_value(OrderStatus::PickedUp).unwrap();
    assert_eq!(json, "picked_up");
    assert_eq!(OrderStatus::PickedUp.to_string(), "picked_up");

    let parsed: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
    assert_eq!(parsed, OrderStatus::Delivered);
}

#[test]
fn test_unknown_role_is_rejected() {
    let result = serde_json::from_value::<RegisterRequest>(serde_json::json!({
        "username": "mallory",
        "password": "pw",
        "role": "superuser",
        "name": "Mallory"
    }));
    assert!(result.is_err());
}

#[test]
fn test_register_contact_fields_are_optional() {
    let req: RegisterRequest = serde_json::from_value(serde_json::json!({
        "username": "carol",
        "password": "pw",
        "role": "customer",
        "name": "Carol"
    }))
    .unwrap();

    assert_eq!(req.role, Role::Customer);
    assert!(req.email.is_none());
    assert!(req.phone.is_none());
}

#[test]
fn test_client_prices_in_order_lines_are_ignored() {
    // Extra fields (like a client-computed price) are dropped on deserialization.
    let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
        "restaurant_id": Uuid::new_v4(),
        "items": [{ "menu_item_id": Uuid::new_v4(), "quantity": 2, "price": 0.01 }],
        "delivery_address": "1 Main St"
    }))
    .unwrap();

    assert_eq!(req.items.len(), 1);
    assert_eq!(req.items[0].quantity, 2);
}

#[test]
fn test_status_request_courier_override_is_optional() {
    let req: UpdateStatusRequest =
        serde_json::from_value(serde_json::json!({ "status": "confirmed" })).unwrap();
    assert_eq!(req.status, OrderStatus::Confirmed);
    assert!(req.delivery_guy_id.is_none());
}

// --- Pricing ---

fn line(menu_item_id: Uuid, quantity: i64) -> food_delivery::models::OrderLineRequest {
    food_delivery::models::OrderLineRequest {
        menu_item_id,
        quantity,
    }
}

#[test]
fn test_total_uses_catalog_prices() {
    let burger = Uuid::new_v4();
    let fries = Uuid::new_v4();
    let catalog = HashMap::from([(burger, dec!(12.99)), (fries, dec!(3.50))]);

    let priced = price_order(&[line(burger, 2), line(fries, 1)], &catalog).unwrap();

    assert_eq!(priced.total, dec!(29.48));
    assert_eq!(priced.lines.len(), 2);
    assert_eq!(priced.lines[0].unit_price, dec!(12.99));
    assert_eq!(priced.lines[1].quantity, 1);
}

#[test]
fn test_single_line_total() {
    let burger = Uuid::new_v4();
    let catalog = HashMap::from([(burger, dec!(12.99))]);

    let priced = price_order(&[line(burger, 2)], &catalog).unwrap();
    assert_eq!(priced.total, dec!(25.98));
}

#[test]
fn test_unknown_menu_item_rejects_order() {
    let burger = Uuid::new_v4();
    let catalog = HashMap::from([(burger, dec!(12.99))]);

    let err = price_order(&[line(burger, 1), line(Uuid::new_v4(), 1)], &catalog).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_empty_and_non_positive_lines_reject_order() {
    let burger = Uuid::new_v4();
    let catalog = HashMap::from([(burger, dec!(12.99))]);

    assert!(price_order(&[], &catalog).is_err());
    assert!(price_order(&[line(burger, 0)], &catalog).is_err());
    assert!(price_order(&[line(burger, -1)], &catalog).is_err());
}

// --- Money Storage ---

#[test]
fn test_cents_conversion() {
    assert_eq!(to_cents(dec!(12.99)).unwrap(), 1299);
    assert_eq!(to_cents(Decimal::ZERO).unwrap(), 0);
    assert_eq!(to_cents(dec!(0.005)).unwrap(), 1);
    assert_eq!(to_cents(dec!(2.345)).unwrap(), 235);
    assert_eq!(from_cents(2598), dec!(25.98));
}

#[test]
fn test_negative_price_is_rejected() {
    let err = to_cents(dec!(-1.00)).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}
