// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - user    - accounts and the closed role set
// - catalog - restaurants and dishes, read by the order service
// - order   - order lifecycle, pricing, policy, events
//
// ============================================================================

pub mod catalog;
pub mod order;
pub mod user;
