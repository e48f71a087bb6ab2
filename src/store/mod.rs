// ============================================================================
// Store - persistence boundary for the ordering subsystem
// ============================================================================
//
// `OrderStore` is what the order service depends on. `CatalogStore` covers
// the catalog writes used for seeding; catalog management proper lives
// outside this crate.
//
// Implementations:
// - postgres.rs - sqlx/PostgreSQL adapter (explicit transactions)
// - memory.rs   - in-process adapter for tests and local runs
//
// ============================================================================

mod memory;
mod postgres;

pub use memory::InMemoryOrderStore;
pub use postgres::{connect, PgOrderStore};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::catalog::{Dish, InvalidDish, Restaurant};
use crate::domain::order::{NewOrder, Order, OrderStatus};
use crate::domain::user::User;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidDish(#[from] InvalidDish),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_restaurant(&self, id: Uuid) -> StoreResult<Option<Restaurant>>;
    async fn find_dish(&self, id: Uuid) -> StoreResult<Option<Dish>>;

    /// Order with its items and the owner of its restaurant.
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    async fn orders_for_customer(&self, customer_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>>;
    async fn orders_for_driver(&self, driver_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>>;

    /// Orders across every restaurant owned by `owner_id`.
    async fn orders_for_owner(&self, owner_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>>;

    /// Insert the order and all of its items in one transaction.
    async fn create_order(&self, order: NewOrder) -> StoreResult<Order>;

    /// Set `to` only while the order is still in `from`. `None` when no row
    /// matched.
    async fn update_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Option<Order>>;

    /// Set the driver only if none is assigned yet. `None` when no row
    /// matched (missing order or driver already set).
    async fn assign_driver(&self, order_id: Uuid, driver_id: Uuid) -> StoreResult<Option<Order>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn save_user(&self, user: &User) -> StoreResult<()>;
    async fn save_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()>;
    /// Fails with `InvalidDish` for negative prices or surcharges.
    async fn save_dish(&self, dish: &Dish) -> StoreResult<()>;
}
