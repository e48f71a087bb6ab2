use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, Transaction};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::domain::catalog::{Dish, DishOption, Restaurant};
use crate::domain::order::{Money, NewOrder, Order, OrderItem, OrderItemOption, OrderStatus};
use crate::domain::user::User;

use super::{CatalogStore, OrderStore, StoreError, StoreResult};

// ============================================================================
// PostgreSQL store
// ============================================================================
//
// Schema lives in migrations/. Orders never store the restaurant owner; it is
// joined from restaurants on every read so ownership changes are respected.
//
// ============================================================================

const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.driver_id, o.restaurant_id, r.owner_id, \
                             o.total, o.status, o.created_at, o.updated_at";

pub async fn connect(config: &DatabaseConfig) -> StoreResult<PgPool> {
    tracing::info!(max_connections = config.max_connections, "Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .connect(&config.url)
        .await?;

    Ok(pool)
}

#[derive(FromRow)]
struct RestaurantRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
}

#[derive(FromRow)]
struct DishRow {
    id: Uuid,
    restaurant_id: Uuid,
    name: String,
    price: i64,
    options: Json<Vec<DishOption>>,
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    driver_id: Option<Uuid>,
    restaurant_id: Uuid,
    owner_id: Uuid,
    total: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    dish_id: Uuid,
    options: Json<Vec<OrderItemOption>>,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Restaurant {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
        }
    }
}

impl From<DishRow> for Dish {
    fn from(row: DishRow) -> Self {
        Dish {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            price: Money::from_cents(row.price),
            options: row.options.0,
        }
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> StoreResult<Order> {
        let status = self.status.parse::<OrderStatus>().map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            driver_id: self.driver_id,
            restaurant_id: self.restaurant_id,
            restaurant_owner_id: self.owner_id,
            items,
            total: Money::from_cents(self.total),
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Attach items to order rows with one batched query.
    async fn with_items(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, order_id, dish_id, options FROM order_items WHERE order_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.order_id).or_default().push(OrderItem {
                id: row.id,
                dish_id: row.dish_id,
                options: row.options.0,
            });
        }

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }

    async fn one_with_items(&self, row: Option<OrderRow>) -> StoreResult<Option<Order>> {
        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn select_orders(&self, filter: &str, id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o JOIN restaurants r ON r.id = o.restaurant_id \
             WHERE {filter} = $1 AND ($2::text IS NULL OR o.status = $2) ORDER BY o.created_at"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        self.with_items(rows).await
    }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, order: &NewOrder) -> StoreResult<()> {
        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, dish_id, options, position) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.dish_id)
            .bind(Json(&item.options))
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_restaurant(&self, id: Uuid) -> StoreResult<Option<Restaurant>> {
        let row: Option<RestaurantRow> =
            sqlx::query_as("SELECT id, name, owner_id FROM restaurants WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Restaurant::from))
    }

    async fn find_dish(&self, id: Uuid) -> StoreResult<Option<Dish>> {
        let row: Option<DishRow> =
            sqlx::query_as("SELECT id, restaurant_id, name, price, options FROM dishes WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Dish::from))
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o JOIN restaurants r ON r.id = o.restaurant_id WHERE o.id = $1"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        self.one_with_items(row).await
    }

    async fn orders_for_customer(&self, customer_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        self.select_orders("o.customer_id", customer_id, status).await
    }

    async fn orders_for_driver(&self, driver_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        self.select_orders("o.driver_id", driver_id, status).await
    }

    async fn orders_for_owner(&self, owner_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        self.select_orders("r.owner_id", owner_id, status).await
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        // Rolled back on drop if any statement fails before commit.
        let mut tx = self.pool.begin().await?;

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO orders (id, customer_id, restaurant_id, total, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING created_at",
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.restaurant_id)
        .bind(order.total.cents())
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_items(&mut tx, &order).await?;
        tx.commit().await?;

        tracing::debug!(order_id = %order.id, item_count = order.items.len(), "Order committed");
        Ok(order.into_pending(created_at))
    }

    async fn update_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Option<Order>> {
        let sql = format!(
            "WITH o AS (UPDATE orders SET status = $3, updated_at = now() \
                        WHERE id = $1 AND status = $2 RETURNING *) \
             SELECT {ORDER_COLUMNS} FROM o JOIN restaurants r ON r.id = o.restaurant_id"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await?;
        self.one_with_items(row).await
    }

    async fn assign_driver(&self, order_id: Uuid, driver_id: Uuid) -> StoreResult<Option<Order>> {
        let sql = format!(
            "WITH o AS (UPDATE orders SET driver_id = $2, updated_at = now() \
                        WHERE id = $1 AND driver_id IS NULL RETURNING *) \
             SELECT {ORDER_COLUMNS} FROM o JOIN restaurants r ON r.id = o.restaurant_id"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await?;
        self.one_with_items(row).await
    }
}

#[async_trait]
impl CatalogStore for PgOrderStore {
    async fn save_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, role) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, role = EXCLUDED.role",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO restaurants (id, name, owner_id) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, owner_id = EXCLUDED.owner_id",
        )
        .bind(restaurant.id)
        .bind(&restaurant.name)
        .bind(restaurant.owner_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_dish(&self, dish: &Dish) -> StoreResult<()> {
        dish.validate()?;

        sqlx::query(
            "INSERT INTO dishes (id, restaurant_id, name, price, options) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, price = EXCLUDED.price, \
             options = EXCLUDED.options",
        )
        .bind(dish.id)
        .bind(dish.restaurant_id)
        .bind(&dish.name)
        .bind(dish.price.cents())
        .bind(Json(&dish.options))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
