use crate::domain::user::{User, UserRole};

use super::aggregate::Order;
use super::value_objects::OrderStatus;

// ============================================================================
// Authorization Policy
// ============================================================================
//
// Pure decisions over the closed role set. Adding a role fails to compile
// until every decision handles it.
//
// ============================================================================

/// Whether `user` may read `order`.
pub fn can_see_order(user: &User, order: &Order) -> bool {
    match user.role {
        UserRole::Client => user.id == order.customer_id,
        // Unassigned orders are invisible to every driver.
        UserRole::Delivery => order.driver_id == Some(user.id),
        UserRole::Owner => user.id == order.restaurant_owner_id,
    }
}

/// Whether `user`'s role may set an order to `target`. Does not look at the
/// current status; see [`Order::can_advance_to`].
pub fn can_edit_order(user: &User, target: OrderStatus) -> bool {
    match user.role {
        UserRole::Client => false,
        UserRole::Delivery => matches!(target, OrderStatus::PickedUp | OrderStatus::Delivered),
        UserRole::Owner => matches!(target, OrderStatus::Cooking | OrderStatus::Cooked),
    }
}

/// Role gate for operations restricted to a single role.
pub fn has_role(user: &User, role: UserRole) -> bool {
    user.role == role
}
