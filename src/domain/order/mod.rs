// ============================================================================
// Order Domain - ordering subsystem
// ============================================================================
//
// - Value objects (Money, OrderStatus, OrderItem)
// - Aggregate (Order, NewOrder)
// - Events (topics and payloads published after writes)
// - Commands / Outputs (resolver-facing inputs and result shapes)
// - Errors (client-facing messages)
// - Pricing and Policy (pure rules)
// - Service (OrderService)
//
// ============================================================================

pub mod value_objects;
pub mod aggregate;
pub mod events;
pub mod commands;
pub mod outputs;
pub mod errors;
pub mod pricing;
pub mod policy;
pub mod service;

// Re-export for convenience
pub use value_objects::*;
pub use aggregate::*;
pub use events::*;
pub use commands::*;
pub use outputs::*;
pub use errors::{ErrorKind, OrderError};
pub use service::OrderService;
