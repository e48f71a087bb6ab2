use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::catalog::{Dish, Restaurant};
use crate::domain::order::{NewOrder, Order, OrderStatus};
use crate::domain::user::User;

use super::{CatalogStore, OrderStore, StoreResult};

// ============================================================================
// In-memory store
// ============================================================================
//
// Every mutation runs under a single write lock, which gives the same
// all-or-nothing and conditional-update guarantees as the Postgres adapter.
//
// ============================================================================

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    restaurants: HashMap<Uuid, Restaurant>,
    dishes: HashMap<Uuid, Dish>,
    orders: HashMap<Uuid, Order>,
}

impl Tables {
    /// Join the current restaurant owner, like the SQL adapter does.
    fn hydrate(&self, order: &Order) -> Order {
        let mut order = order.clone();
        if let Some(restaurant) = self.restaurants.get(&order.restaurant_id) {
            order.restaurant_owner_id = restaurant.owner_id;
        }
        order
    }

    fn select<F>(&self, status: Option<OrderStatus>, predicate: F) -> Vec<Order>
    where
        F: Fn(&Order) -> bool,
    {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .map(|order| self.hydrate(order))
            .filter(|order| predicate(order))
            .filter(|order| status.map_or(true, |s| order.status == s))
            .collect();
        orders.sort_by_key(|order| order.created_at);
        orders
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    tables: RwLock<Tables>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_restaurant(&self, id: Uuid) -> StoreResult<Option<Restaurant>> {
        Ok(self.tables.read().await.restaurants.get(&id).cloned())
    }

    async fn find_dish(&self, id: Uuid) -> StoreResult<Option<Dish>> {
        Ok(self.tables.read().await.dishes.get(&id).cloned())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).map(|order| tables.hydrate(order)))
    }

    async fn orders_for_customer(&self, customer_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.select(status, |order| order.customer_id == customer_id))
    }

    async fn orders_for_driver(&self, driver_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.select(status, |order| order.driver_id == Some(driver_id)))
    }

    async fn orders_for_owner(&self, owner_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.select(status, |order| order.restaurant_owner_id == owner_id))
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        let order = order.into_pending(Utc::now());
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        let Some(order) = tables.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        if order.status != from {
            return Ok(None);
        }
        order.status = to;
        order.updated_at = Utc::now();
        let order = order.clone();
        Ok(Some(tables.hydrate(&order)))
    }

    async fn assign_driver(&self, order_id: Uuid, driver_id: Uuid) -> StoreResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        let Some(order) = tables.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        if order.driver_id.is_some() {
            return Ok(None);
        }
        order.driver_id = Some(driver_id);
        order.updated_at = Utc::now();
        let order = order.clone();
        Ok(Some(tables.hydrate(&order)))
    }
}

#[async_trait]
impl CatalogStore for InMemoryOrderStore {
    async fn save_user(&self, user: &User) -> StoreResult<()> {
        self.tables.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()> {
        self.tables.write().await.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(())
    }

    async fn save_dish(&self, dish: &Dish) -> StoreResult<()> {
        dish.validate()?;
        self.tables.write().await.dishes.insert(dish.id, dish.clone());
        Ok(())
    }
}
