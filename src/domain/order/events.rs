use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::aggregate::Order;

// ============================================================================
// Order Events - published after an order write commits
// ============================================================================

/// Pub/sub topics. The string form is the wire channel name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "pendingOrders")]
    PendingOrders,
    #[serde(rename = "cookedOrders")]
    CookedOrders,
    #[serde(rename = "orderUpdates")]
    OrderUpdates,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::PendingOrders, Topic::CookedOrders, Topic::OrderUpdates];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::PendingOrders => "pendingOrders",
            Topic::CookedOrders => "cookedOrders",
            Topic::OrderUpdates => "orderUpdates",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order Event - Union type for all order events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    PendingOrderCreated(PendingOrderCreated),
    OrderCooked(Order),
    OrderUpdated(Order),
}

/// New order waiting for the restaurant owner to accept it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrderCreated {
    pub order: Order,
    pub owner_id: Uuid,
}

impl OrderEvent {
    pub fn topic(&self) -> Topic {
        match self {
            OrderEvent::PendingOrderCreated(_) => Topic::PendingOrders,
            OrderEvent::OrderCooked(_) => Topic::CookedOrders,
            OrderEvent::OrderUpdated(_) => Topic::OrderUpdates,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::PendingOrderCreated(_) => "PendingOrderCreated",
            OrderEvent::OrderCooked(_) => "OrderCooked",
            OrderEvent::OrderUpdated(_) => "OrderUpdated",
        }
    }

    pub fn order(&self) -> &Order {
        match self {
            OrderEvent::PendingOrderCreated(e) => &e.order,
            OrderEvent::OrderCooked(order) | OrderEvent::OrderUpdated(order) => order,
        }
    }

    pub fn order_id(&self) -> Uuid {
        self.order().id
    }
}
