use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{OrderItemOption, OrderStatus};

// ============================================================================
// Order Commands - plain input objects handed over by the resolver layer
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItemInput {
    pub dish_id: Uuid,
    #[serde(default)]
    pub options: Vec<OrderItemOption>,
}

impl CreateOrderItemInput {
    pub fn plain(dish_id: Uuid) -> Self {
        Self {
            dish_id,
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub restaurant_id: Uuid,
    pub items: Vec<CreateOrderItemInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetOrdersInput {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetOrderInput {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOrderInput {
    pub id: Uuid,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeOrderInput {
    pub id: Uuid,
}
