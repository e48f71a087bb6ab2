use serde::Serialize;

use super::pricing::PricingError;
use crate::store::StoreError;

// ============================================================================
// Order Errors
// ============================================================================
//
// Messages are part of the wire contract with existing clients and are kept
// verbatim, typos included.
//
// ============================================================================

pub const RESTAURANT_NOT_FOUND: &str = "Restaurant not found";
pub const DISH_NOT_FOUND: &str = "Dish not found.";
pub const ORDER_NOT_FOUND: &str = "Order not found.";
pub const TAKE_ORDER_NOT_FOUND: &str = "Order not found";
pub const CANT_SEE_ORDER: &str = "You cant see that";
pub const CANT_SEE_EDITED_ORDER: &str = "Can't see order.";
pub const CANT_EDIT_ORDER: &str = "Can't edit order.";
pub const FORWARD_ONLY: &str = "Order status can only move forward.";
pub const STATUS_CHANGED: &str = "Order status changed, try again.";
pub const ALREADY_HAS_DRIVER: &str = "This order already has a driver";
pub const FORBIDDEN_RESOURCE: &str = "Forbidden resource";

pub const COULD_NOT_CREATE: &str = "Could not create order.";
pub const COULD_NOT_GET_ORDERS: &str = "Could not get orders";
pub const COULD_NOT_LOAD: &str = "Could not load order.";
pub const COULD_NOT_EDIT: &str = "Could not edit order.";
pub const COULD_NOT_TAKE: &str = "Could not upate order.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{message}")]
    Pricing {
        message: &'static str,
        #[source]
        source: PricingError,
    },
}

impl OrderError {
    pub fn internal(message: &'static str) -> impl FnOnce(StoreError) -> OrderError {
        move |source| OrderError::Internal { message, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::Forbidden(_) => ErrorKind::Forbidden,
            OrderError::Conflict(_) => ErrorKind::Conflict,
            OrderError::Internal { .. } | OrderError::Pricing { .. } => ErrorKind::Internal,
        }
    }
}
