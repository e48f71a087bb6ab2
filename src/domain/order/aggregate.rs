use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::value_objects::{Money, OrderItem, OrderStatus};

// ============================================================================
// Order - the persisted order with its items
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // Identity
    pub id: Uuid,

    // Parties
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub restaurant_id: Uuid,
    pub restaurant_owner_id: Uuid,

    // Contents
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to insert a new order, as computed by the service.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub restaurant_owner_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total: Money,
}

impl NewOrder {
    /// Materialise the row as it looks right after insertion.
    pub fn into_pending(self, now: DateTime<Utc>) -> Order {
        Order {
            id: self.id,
            customer_id: self.customer_id,
            driver_id: None,
            restaurant_id: self.restaurant_id,
            restaurant_owner_id: self.restaurant_owner_id,
            items: self.items,
            total: self.total,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Order {
    pub fn has_driver(&self) -> bool {
        self.driver_id.is_some()
    }

    /// Forward-only lifecycle: the target must come strictly after the
    /// current status. Skipping intermediate states is allowed.
    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        target.rank() > self.status.rank()
    }
}
