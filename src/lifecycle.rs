//! Order Lifecycle Controller.
//!
//! Status changes are authorized per role rather than validated against a global transition
//! graph:
//!
//! | Role       | Precondition                         | Allowed targets                          |
//! |------------|--------------------------------------|------------------------------------------|
//! | restaurant | owns the order's restaurant          | confirmed, rejected, preparing, ready    |
//! | delivery   | order has no courier                 | accepted (claims the order)              |
//! | delivery   | caller is the assigned courier       | picked_up, delivered                     |
//! | admin      | none                                 | any, optionally reassigning the courier  |
//! | customer   | -                                    | none                                     |
//!
//! Planning is pure (`plan_transition`); `update_status` executes the plan. Courier writes are
//! compare-and-set updates in the repository, so the read used for planning is only advisory.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{Order, OrderScope, OrderStatus, Role, UpdateStatusRequest},
    repository::Repository,
};

/// Targets a restaurant owner may set on their own restaurant's orders.
pub const RESTAURANT_TARGETS: [OrderStatus; 4] = [
    OrderStatus::Confirmed,
    OrderStatus::Rejected,
    OrderStatus::Preparing,
    OrderStatus::Ready,
];

/// Targets the assigned courier may set.
pub const COURIER_TARGETS: [OrderStatus; 2] = [OrderStatus::PickedUp, OrderStatus::Delivered];

/// visibility_scope
///
/// The slice of the Order Ledger `actor` may read: everything for admins, their restaurants'
/// orders for owners, assigned orders plus the unclaimed confirmed pool for couriers, and their
/// own orders for customers.
pub fn visibility_scope(actor: &AuthUser) -> OrderScope {
    match actor.role {
        Role::Admin => OrderScope::All,
        Role::Restaurant => OrderScope::OwnedRestaurants(actor.id),
        Role::Delivery => OrderScope::Courier(actor.id),
        Role::Customer => OrderScope::Customer(actor.id),
    }
}

/// Transition
///
/// An authorized status request, ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Restaurant owner overwrites the status.
    Restaurant(OrderStatus),
    /// Courier claims an unassigned order: sets itself as courier and the status to `accepted`.
    Claim,
    /// Assigned courier advances the delivery.
    Courier(OrderStatus),
    /// Unconditional admin write.
    Override {
        status: OrderStatus,
        delivery_guy_id: Option<Uuid>,
    },
}

/// plan_transition
///
/// Decides whether `actor` may move `order` to `req.status`. `owns_restaurant` is only
/// consulted for restaurant-role callers.
pub fn plan_transition(
    actor: &AuthUser,
    order: &Order,
    owns_restaurant: bool,
    req: &UpdateStatusRequest,
) -> Result<Transition, AppError> {
    match actor.role {
        Role::Restaurant => {
            if !owns_restaurant {
                return Err(AppError::Forbidden("Not your restaurant".to_string()));
            }
            if !RESTAURANT_TARGETS.contains(&req.status) {
                return Err(AppError::Forbidden(format!(
                    "Restaurants cannot set status {}",
                    req.status
                )));
            }
            Ok(Transition::Restaurant(req.status))
        }
        Role::Delivery => match req.status {
            OrderStatus::Accepted => match order.delivery_guy_id {
                None => Ok(Transition::Claim),
                Some(_) => Err(AppError::Conflict(
                    "Order has already been claimed".to_string(),
                )),
            },
            status if COURIER_TARGETS.contains(&status) => {
                if order.delivery_guy_id == Some(actor.id) {
                    Ok(Transition::Courier(status))
                } else {
                    Err(AppError::Forbidden(
                        "Order is not assigned to you".to_string(),
                    ))
                }
            }
            status => Err(AppError::Forbidden(format!(
                "Couriers cannot set status {status}"
            ))),
        },
        Role::Admin => Ok(Transition::Override {
            status: req.status,
            delivery_guy_id: req.delivery_guy_id,
        }),
        Role::Customer => Err(AppError::Forbidden("Insufficient permissions".to_string())),
    }
}

/// update_status
///
/// Loads the order (`NotFound` if absent), plans the transition for `actor`, and writes it.
/// A courier claim that loses the race reports `Conflict`; a courier update whose assignment
/// changed underneath reports `Forbidden`. Returns the order as stored after the write.
pub async fn update_status(
    repo: &dyn Repository,
    actor: AuthUser,
    order_id: Uuid,
    req: UpdateStatusRequest,
) -> Result<Order, AppError> {
    let order = repo
        .get_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let owns_restaurant = match actor.role {
        Role::Restaurant => repo.is_restaurant_owner(order.restaurant_id, actor.id).await?,
        Role::Admin | Role::Delivery | Role::Customer => false,
    };

    let transition = plan_transition(&actor, &order, owns_restaurant, &req)?;

    let written = match transition {
        Transition::Restaurant(status) => repo.set_status(order_id, status).await?,
        Transition::Claim => {
            if !repo.claim_order(order_id, actor.id).await? {
                tracing::info!(%order_id, courier = %actor.id, "courier claim lost");
                return Err(AppError::Conflict(
                    "Order has already been claimed".to_string(),
                ));
            }
            tracing::info!(%order_id, courier = %actor.id, "courier claim won");
            true
        }
        Transition::Courier(status) => {
            if !repo.set_status_as_courier(order_id, actor.id, status).await? {
                return Err(AppError::Forbidden(
                    "Order is not assigned to you".to_string(),
                ));
            }
            true
        }
        Transition::Override {
            status,
            delivery_guy_id,
        } => {
            if let Some(courier_id) = delivery_guy_id {
                ensure_courier(repo, courier_id).await?;
            }
            repo.override_order(order_id, status, delivery_guy_id)
                .await?
        }
    };

    if !written {
        return Err(AppError::NotFound("Order not found".to_string()));
    }

    let updated = repo
        .get_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    tracing::info!(
        %order_id,
        actor = %actor.id,
        role = %actor.role,
        from = %order.status,
        to = %updated.status,
        "order status updated"
    );

    Ok(updated)
}

// Reassignment targets must be existing courier accounts.
async fn ensure_courier(repo: &dyn Repository, courier_id: Uuid) -> Result<(), AppError> {
    match repo.get_account(courier_id).await? {
        Some(account) if account.role == Role::Delivery => Ok(()),
        _ => Err(AppError::Validation(format!(
            "Account {courier_id} is not a delivery courier"
        ))),
    }
}
