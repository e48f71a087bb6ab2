use serde::Serialize;
use uuid::Uuid;

use super::aggregate::Order;
use super::errors::OrderError;

// ============================================================================
// Result shapes returned to the resolver layer
// ============================================================================
//
// `ok` gates whether `error` or the payload is meaningful. Operations never
// return Err to their caller.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreOutput {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CoreOutput {
    pub fn success() -> Self {
        Self { ok: true, error: None }
    }

    pub fn failure(err: &OrderError) -> Self {
        Self {
            ok: false,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderOutput {
    #[serde(flatten)]
    pub core: CoreOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrdersOutput {
    #[serde(flatten)]
    pub core: CoreOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Order>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrderOutput {
    #[serde(flatten)]
    pub core: CoreOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

pub type EditOrderOutput = CoreOutput;
pub type TakeOrderOutput = CoreOutput;

impl CreateOrderOutput {
    pub fn from_result(result: Result<Uuid, OrderError>) -> Self {
        match result {
            Ok(order_id) => Self { core: CoreOutput::success(), order_id: Some(order_id) },
            Err(err) => Self { core: CoreOutput::failure(&err), order_id: None },
        }
    }
}

impl GetOrdersOutput {
    pub fn from_result(result: Result<Vec<Order>, OrderError>) -> Self {
        match result {
            Ok(orders) => Self { core: CoreOutput::success(), orders: Some(orders) },
            Err(err) => Self { core: CoreOutput::failure(&err), orders: None },
        }
    }
}

impl GetOrderOutput {
    pub fn from_result(result: Result<Order, OrderError>) -> Self {
        match result {
            Ok(order) => Self { core: CoreOutput::success(), order: Some(order) },
            Err(err) => Self { core: CoreOutput::failure(&err), order: None },
        }
    }
}

impl CoreOutput {
    pub fn from_result(result: Result<(), OrderError>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(err) => Self::failure(&err),
        }
    }
}
