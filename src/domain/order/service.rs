use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::domain::user::{User, UserRole};
use crate::messaging::{EventBus, EventEnvelope};
use crate::metrics::Metrics;
use crate::store::OrderStore;

use super::aggregate::{NewOrder, Order};
use super::commands::{CreateOrderInput, EditOrderInput, GetOrderInput, GetOrdersInput, TakeOrderInput};
use super::errors::*;
use super::events::{OrderEvent, PendingOrderCreated};
use super::outputs::{CreateOrderOutput, EditOrderOutput, GetOrderOutput, GetOrdersOutput, TakeOrderOutput};
use super::value_objects::{OrderItem, OrderStatus};
use super::{policy, pricing};

// ============================================================================
// Order Service
// ============================================================================
//
// Orchestrates: Policy → Store (single write) → Events
//
// Every public operation returns a result shape and never an Err. Events are
// published only after the write succeeded, in the order the caller sees
// them documented below.
//
// ============================================================================

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    bus: Arc<dyn EventBus>,
    metrics: Arc<Metrics>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, bus: Arc<dyn EventBus>, metrics: Arc<Metrics>) -> Self {
        Self { store, bus, metrics }
    }

    /// Price and persist a new order, then announce it on `pendingOrders`.
    #[tracing::instrument(skip_all, fields(user_id = %customer.id, restaurant_id = %input.restaurant_id))]
    pub async fn create_order(&self, customer: &User, input: CreateOrderInput) -> CreateOrderOutput {
        let started = Instant::now();
        let result = self.try_create_order(customer, input).await;
        self.observe("create_order", started, &result);
        CreateOrderOutput::from_result(result.map(|order| order.id))
    }

    #[tracing::instrument(skip_all, fields(user_id = %user.id, status = ?input.status))]
    pub async fn get_orders(&self, user: &User, input: GetOrdersInput) -> GetOrdersOutput {
        let started = Instant::now();
        let result = self.try_get_orders(user, input).await;
        self.observe("get_orders", started, &result);
        GetOrdersOutput::from_result(result)
    }

    #[tracing::instrument(skip_all, fields(user_id = %user.id, order_id = %input.id))]
    pub async fn get_order(&self, user: &User, input: GetOrderInput) -> GetOrderOutput {
        let started = Instant::now();
        let result = self.try_get_order(user, input).await;
        self.observe("get_order", started, &result);
        GetOrderOutput::from_result(result)
    }

    /// Move an order forward. Publishes `cookedOrders` (owner marking it
    /// Cooked) before `orderUpdates`.
    #[tracing::instrument(skip_all, fields(user_id = %user.id, order_id = %input.id, status = ?input.status))]
    pub async fn edit_order(&self, user: &User, input: EditOrderInput) -> EditOrderOutput {
        let started = Instant::now();
        let result = self.try_edit_order(user, input).await;
        self.observe("edit_order", started, &result);
        EditOrderOutput::from_result(result.map(|_| ()))
    }

    /// Assign `driver` to an order that has none yet. First assignment wins.
    #[tracing::instrument(skip_all, fields(user_id = %driver.id, order_id = %input.id))]
    pub async fn take_order(&self, driver: &User, input: TakeOrderInput) -> TakeOrderOutput {
        let started = Instant::now();
        let result = self.try_take_order(driver, input).await;
        self.observe("take_order", started, &result);
        TakeOrderOutput::from_result(result.map(|_| ()))
    }

    // ========================================================================
    // Operations
    // ========================================================================

    async fn try_create_order(&self, customer: &User, input: CreateOrderInput) -> Result<Order, OrderError> {
        if !policy::has_role(customer, UserRole::Client) {
            return Err(OrderError::Forbidden(FORBIDDEN_RESOURCE));
        }

        let restaurant = self
            .store
            .find_restaurant(input.restaurant_id)
            .await
            .map_err(OrderError::internal(COULD_NOT_CREATE))?
            .ok_or(OrderError::NotFound(RESTAURANT_NOT_FOUND))?;

        // Resolve every dish before writing anything.
        let mut dishes = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let dish = self
                .store
                .find_dish(item.dish_id)
                .await
                .map_err(OrderError::internal(COULD_NOT_CREATE))?
                .filter(|dish| dish.restaurant_id == restaurant.id)
                .ok_or(OrderError::NotFound(DISH_NOT_FOUND))?;
            dishes.push(dish);
        }

        let total = pricing::order_total(
            dishes
                .iter()
                .zip(&input.items)
                .map(|(dish, item)| (dish, item.options.as_slice())),
        )
        .map_err(|source| OrderError::Pricing { message: COULD_NOT_CREATE, source })?;

        let items = input
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                dish_id: item.dish_id,
                options: item.options,
            })
            .collect();

        let order = self
            .store
            .create_order(NewOrder {
                id: Uuid::new_v4(),
                customer_id: customer.id,
                restaurant_id: restaurant.id,
                restaurant_owner_id: restaurant.owner_id,
                items,
                total,
            })
            .await
            .map_err(OrderError::internal(COULD_NOT_CREATE))?;

        self.metrics.orders_created.inc();
        tracing::info!(order_id = %order.id, total = %order.total, "Order created");

        self.publish(
            OrderEvent::PendingOrderCreated(PendingOrderCreated {
                order: order.clone(),
                owner_id: restaurant.owner_id,
            }),
            customer.id,
        )
        .await;

        Ok(order)
    }

    async fn try_get_orders(&self, user: &User, input: GetOrdersInput) -> Result<Vec<Order>, OrderError> {
        let orders = match user.role {
            UserRole::Client => self.store.orders_for_customer(user.id, input.status).await,
            UserRole::Delivery => self.store.orders_for_driver(user.id, input.status).await,
            UserRole::Owner => self.store.orders_for_owner(user.id, input.status).await,
        }
        .map_err(OrderError::internal(COULD_NOT_GET_ORDERS))?;

        tracing::debug!(count = orders.len(), "Orders loaded");
        Ok(orders)
    }

    async fn try_get_order(&self, user: &User, input: GetOrderInput) -> Result<Order, OrderError> {
        let order = self
            .store
            .find_order(input.id)
            .await
            .map_err(OrderError::internal(COULD_NOT_LOAD))?
            .ok_or(OrderError::NotFound(ORDER_NOT_FOUND))?;

        if !policy::can_see_order(user, &order) {
            return Err(OrderError::Forbidden(CANT_SEE_ORDER));
        }

        Ok(order)
    }

    async fn try_edit_order(&self, user: &User, input: EditOrderInput) -> Result<Order, OrderError> {
        let order = self
            .store
            .find_order(input.id)
            .await
            .map_err(OrderError::internal(COULD_NOT_EDIT))?
            .ok_or(OrderError::NotFound(ORDER_NOT_FOUND))?;

        if !policy::can_see_order(user, &order) {
            return Err(OrderError::Forbidden(CANT_SEE_EDITED_ORDER));
        }
        if !policy::can_edit_order(user, input.status) {
            return Err(OrderError::Forbidden(CANT_EDIT_ORDER));
        }
        if !order.can_advance_to(input.status) {
            return Err(OrderError::Conflict(FORWARD_ONLY));
        }

        // Conditional on the status we validated against.
        let updated = self
            .store
            .update_status(order.id, order.status, input.status)
            .await
            .map_err(OrderError::internal(COULD_NOT_EDIT))?
            .ok_or(OrderError::Conflict(STATUS_CHANGED))?;

        self.metrics.record_transition(order.status, updated.status);
        tracing::info!(from = %order.status, to = %updated.status, "Order status changed");

        if user.role == UserRole::Owner && updated.status == OrderStatus::Cooked {
            self.publish(OrderEvent::OrderCooked(updated.clone()), user.id).await;
        }
        self.publish(OrderEvent::OrderUpdated(updated.clone()), user.id).await;

        Ok(updated)
    }

    async fn try_take_order(&self, driver: &User, input: TakeOrderInput) -> Result<Order, OrderError> {
        if !policy::has_role(driver, UserRole::Delivery) {
            return Err(OrderError::Forbidden(FORBIDDEN_RESOURCE));
        }

        let order = self
            .store
            .find_order(input.id)
            .await
            .map_err(OrderError::internal(COULD_NOT_TAKE))?
            .ok_or(OrderError::NotFound(TAKE_ORDER_NOT_FOUND))?;

        if order.has_driver() {
            return Err(OrderError::Conflict(ALREADY_HAS_DRIVER));
        }

        // Another driver may have won between the read and this write.
        let updated = self
            .store
            .assign_driver(order.id, driver.id)
            .await
            .map_err(OrderError::internal(COULD_NOT_TAKE))?
            .ok_or(OrderError::Conflict(ALREADY_HAS_DRIVER))?;

        self.metrics.drivers_assigned.inc();
        tracing::info!("Driver assigned");

        self.publish(OrderEvent::OrderUpdated(updated.clone()), driver.id).await;

        Ok(updated)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Publish failures are logged and counted; the write already committed.
    async fn publish(&self, event: OrderEvent, actor_id: Uuid) {
        let topic = event.topic();
        let order_id = event.order_id();
        let envelope = EventEnvelope::new(event).with_actor(actor_id);

        match self.bus.publish(envelope).await {
            Ok(receivers) => {
                self.metrics.record_publish(topic, true);
                tracing::debug!(%topic, %order_id, receivers, "Event published");
            }
            Err(e) => {
                self.metrics.record_publish(topic, false);
                tracing::error!(%topic, %order_id, error = %e, "Failed to publish event");
            }
        }
    }

    fn observe<T>(&self, operation: &'static str, started: Instant, result: &Result<T, OrderError>) {
        let failure = result.as_ref().err().map(OrderError::kind);
        self.metrics
            .record_operation(operation, started.elapsed().as_secs_f64(), failure);

        match result {
            Err(e) if e.kind() == ErrorKind::Internal => {
                let cause = std::error::Error::source(e).map(ToString::to_string).unwrap_or_default();
                tracing::error!(operation, error = %e, cause = %cause, "Order operation failed");
            }
            Err(e) => tracing::warn!(operation, error = %e, "Order operation rejected"),
            Ok(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{Dish, DishChoice, DishOption, Restaurant};
    use crate::domain::order::{CreateOrderItemInput, Money, OrderItemOption, Topic};
    use crate::messaging::{InMemoryEventBus, MockEventBus, PublishError, Subscription};
    use crate::store::{CatalogStore, InMemoryOrderStore, MockOrderStore, StoreError};
    use chrono::Utc;

    struct Fixture {
        service: OrderService,
        store: Arc<InMemoryOrderStore>,
        bus: InMemoryEventBus,
        metrics: Arc<Metrics>,
        client: User,
        owner: User,
        driver: User,
        restaurant: Restaurant,
        pizza: Dish,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryOrderStore::new());
        let bus = InMemoryEventBus::default();
        let metrics = Arc::new(Metrics::new().unwrap());

        let client = User::new("client@example.com", UserRole::Client);
        let owner = User::new("owner@example.com", UserRole::Owner);
        let driver = User::new("driver@example.com", UserRole::Delivery);
        let restaurant = Restaurant::new("Luigi's", owner.id);
        let pizza = Dish::new(restaurant.id, "Pizza", Money::from_cents(1000)).with_option(
            DishOption::with_choices(
                "Size",
                vec![
                    DishChoice { name: "Small".into(), extra: None },
                    DishChoice { name: "Large".into(), extra: Some(Money::from_cents(200)) },
                ],
            ),
        );

        for user in [&client, &owner, &driver] {
            store.save_user(user).await.unwrap();
        }
        store.save_restaurant(&restaurant).await.unwrap();
        store.save_dish(&pizza).await.unwrap();

        let service = OrderService::new(store.clone(), Arc::new(bus.clone()), metrics.clone());

        Fixture { service, store, bus, metrics, client, owner, driver, restaurant, pizza }
    }

    fn large_pizza(f: &Fixture) -> CreateOrderInput {
        CreateOrderInput {
            restaurant_id: f.restaurant.id,
            items: vec![CreateOrderItemInput {
                dish_id: f.pizza.id,
                options: vec![OrderItemOption::with_choice("Size", "Large")],
            }],
        }
    }

    async fn place_order(f: &Fixture) -> Uuid {
        let output = f.service.create_order(&f.client, large_pizza(f)).await;
        assert!(output.core.ok, "{:?}", output.core.error);
        output.order_id.unwrap()
    }

    fn drain(subscription: &mut Subscription) -> Vec<Arc<EventEnvelope>> {
        std::iter::from_fn(|| subscription.try_next()).collect()
    }

    fn pending_order(owner_id: Uuid) -> Order {
        NewOrder {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            restaurant_owner_id: owner_id,
            items: vec![],
            total: Money::from_cents(500),
        }
        .into_pending(Utc::now())
    }

    // ------------------------------------------------------------------------
    // create_order
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_order_prices_and_announces() {
        let f = fixture().await;
        let mut pending = f.bus.pending_orders(&f.owner).unwrap();

        let order_id = place_order(&f).await;

        let order = f.store.find_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.total, Money::from_cents(1200));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.customer_id, f.client.id);
        assert_eq!(order.items.len(), 1);

        let events = drain(&mut pending);
        assert_eq!(events.len(), 1);
        match &events[0].payload {
            OrderEvent::PendingOrderCreated(event) => {
                assert_eq!(event.owner_id, f.restaurant.owner_id);
                assert_eq!(event.order.id, order_id);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[0].actor_id, Some(f.client.id));
        assert_eq!(f.metrics.orders_created.get(), 1);
    }

    #[tokio::test]
    async fn test_create_order_missing_restaurant() {
        let f = fixture().await;
        let input = CreateOrderInput { restaurant_id: Uuid::new_v4(), items: vec![] };

        let output = f.service.create_order(&f.client, input).await;

        assert!(!output.core.ok);
        assert_eq!(output.core.error.as_deref(), Some("Restaurant not found"));
        assert_eq!(output.order_id, None);
    }

    #[tokio::test]
    async fn test_create_order_missing_dish_commits_nothing() {
        let f = fixture().await;
        let mut pending = f.bus.pending_orders(&f.owner).unwrap();
        let mut input = large_pizza(&f);
        input.items.push(CreateOrderItemInput::plain(Uuid::new_v4()));

        let output = f.service.create_order(&f.client, input).await;

        assert_eq!(output.core.error.as_deref(), Some("Dish not found."));
        assert_eq!(f.store.order_count().await, 0);
        assert!(drain(&mut pending).is_empty());
    }

    #[tokio::test]
    async fn test_create_order_rejects_dish_from_other_restaurant() {
        let f = fixture().await;
        let elsewhere = Dish::new(Uuid::new_v4(), "Sushi", Money::from_cents(900));
        f.store.save_dish(&elsewhere).await.unwrap();

        let input = CreateOrderInput {
            restaurant_id: f.restaurant.id,
            items: vec![CreateOrderItemInput::plain(elsewhere.id)],
        };
        let output = f.service.create_order(&f.client, input).await;

        assert_eq!(output.core.error.as_deref(), Some("Dish not found."));
        assert_eq!(f.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_order_requires_client() {
        let f = fixture().await;

        let output = f.service.create_order(&f.owner, large_pizza(&f)).await;

        assert_eq!(output.core.error.as_deref(), Some("Forbidden resource"));
        assert_eq!(f.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_order_storage_failure_publishes_nothing() {
        let client = User::new("client@example.com", UserRole::Client);
        let mut store = MockOrderStore::new();
        store
            .expect_find_restaurant()
            .returning(|_| Err(StoreError::Unavailable("connection reset".into())));
        let mut bus = MockEventBus::new();
        bus.expect_publish().never();

        let service = OrderService::new(Arc::new(store), Arc::new(bus), Arc::new(Metrics::new().unwrap()));
        let input = CreateOrderInput { restaurant_id: Uuid::new_v4(), items: vec![] };
        let output = service.create_order(&client, input).await;

        assert_eq!(output.core.error.as_deref(), Some("Could not create order."));
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_committed_order() {
        let f = fixture().await;
        let mut bus = MockEventBus::new();
        bus.expect_publish().times(1).returning(|_| Err(PublishError::CircuitOpen));
        let service = OrderService::new(f.store.clone(), Arc::new(bus), f.metrics.clone());

        let output = service.create_order(&f.client, large_pizza(&f)).await;

        assert!(output.core.ok);
        assert_eq!(f.store.order_count().await, 1);
        assert_eq!(
            f.metrics.event_publish_failures.with_label_values(&[Topic::PendingOrders.as_str()]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_order_total_out_of_range_commits_nothing() {
        let f = fixture().await;
        let mut pending = f.bus.pending_orders(&f.owner).unwrap();
        let banquet = Dish::new(f.restaurant.id, "Banquet", Money::from_cents(i64::MAX))
            .with_option(DishOption::flat("Candles", Money::from_cents(1)));
        f.store.save_dish(&banquet).await.unwrap();

        let input = CreateOrderInput {
            restaurant_id: f.restaurant.id,
            items: vec![CreateOrderItemInput {
                dish_id: banquet.id,
                options: vec![OrderItemOption::new("Candles")],
            }],
        };
        let output = f.service.create_order(&f.client, input).await;

        assert_eq!(output.core.error.as_deref(), Some("Could not create order."));
        assert_eq!(output.order_id, None);
        assert_eq!(f.store.order_count().await, 0);
        assert!(drain(&mut pending).is_empty());
        assert_eq!(
            f.metrics.operation_failures.with_label_values(&["create_order", "internal"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_order_refuses_negative_surcharge() {
        let client = User::new("client@example.com", UserRole::Client);
        let restaurant = Restaurant::new("Luigi's", Uuid::new_v4());
        let dish = Dish::new(restaurant.id, "Pizza", Money::from_cents(1000))
            .with_option(DishOption::flat("Voucher", Money::from_cents(-5000)));
        let dish_id = dish.id;

        let mut store = MockOrderStore::new();
        store.expect_find_restaurant().returning(move |_| Ok(Some(restaurant.clone())));
        store.expect_find_dish().returning(move |_| Ok(Some(dish.clone())));
        store.expect_create_order().never();
        let mut bus = MockEventBus::new();
        bus.expect_publish().never();

        let service = OrderService::new(Arc::new(store), Arc::new(bus), Arc::new(Metrics::new().unwrap()));
        let input = CreateOrderInput {
            restaurant_id: Uuid::new_v4(),
            items: vec![CreateOrderItemInput {
                dish_id,
                options: vec![OrderItemOption::new("Voucher")],
            }],
        };
        let output = service.create_order(&client, input).await;

        assert_eq!(output.core.error.as_deref(), Some("Could not create order."));
    }

    // ------------------------------------------------------------------------
    // get_orders / get_order
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_orders_is_role_scoped() {
        let f = fixture().await;
        let order_id = place_order(&f).await;

        let mine = f.service.get_orders(&f.client, GetOrdersInput::default()).await;
        assert_eq!(mine.orders.unwrap().len(), 1);

        let owned = f.service.get_orders(&f.owner, GetOrdersInput::default()).await;
        assert_eq!(owned.orders.unwrap()[0].id, order_id);

        let assigned = f.service.get_orders(&f.driver, GetOrdersInput::default()).await;
        assert!(assigned.core.ok);
        assert!(assigned.orders.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_orders_filters_by_status() {
        let f = fixture().await;
        place_order(&f).await;

        let cooking = GetOrdersInput { status: Some(OrderStatus::Cooking) };
        let output = f.service.get_orders(&f.client, cooking).await;

        assert!(output.core.ok);
        assert!(output.orders.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_order_hidden_from_unassigned_driver() {
        let f = fixture().await;
        let order_id = place_order(&f).await;

        let output = f.service.get_order(&f.driver, GetOrderInput { id: order_id }).await;

        assert!(!output.core.ok);
        assert_eq!(output.core.error.as_deref(), Some("You cant see that"));
        assert_eq!(output.order, None);
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let f = fixture().await;

        let output = f.service.get_order(&f.client, GetOrderInput { id: Uuid::new_v4() }).await;

        assert_eq!(output.core.error.as_deref(), Some("Order not found."));
    }

    #[tokio::test]
    async fn test_get_order_for_customer() {
        let f = fixture().await;
        let order_id = place_order(&f).await;

        let output = f.service.get_order(&f.client, GetOrderInput { id: order_id }).await;

        assert!(output.core.ok);
        assert_eq!(output.order.unwrap().total, Money::from_cents(1200));
    }

    // ------------------------------------------------------------------------
    // edit_order
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_owner_cooks_order_publishes_both_topics() {
        let f = fixture().await;
        let order_id = place_order(&f).await;
        let mut cooked = f.bus.cooked_orders(&f.driver).unwrap();
        let mut updates = f.bus.order_updates(&f.owner, order_id);

        let input = EditOrderInput { id: order_id, status: OrderStatus::Cooked };
        let output = f.service.edit_order(&f.owner, input).await;

        assert!(output.ok, "{:?}", output.error);
        assert_eq!(drain(&mut cooked).len(), 1);
        let events = drain(&mut updates);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload.order().status, OrderStatus::Cooked);
        assert_eq!(
            f.metrics.status_transitions.with_label_values(&["Pending", "Cooked"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_cooking_does_not_reach_drivers() {
        let f = fixture().await;
        let order_id = place_order(&f).await;
        let mut cooked = f.bus.cooked_orders(&f.driver).unwrap();

        let input = EditOrderInput { id: order_id, status: OrderStatus::Cooking };
        assert!(f.service.edit_order(&f.owner, input).await.ok);

        assert!(drain(&mut cooked).is_empty());
    }

    #[tokio::test]
    async fn test_client_cannot_edit() {
        let f = fixture().await;
        let order_id = place_order(&f).await;
        let mut updates = f.bus.order_updates(&f.client, order_id);

        let input = EditOrderInput { id: order_id, status: OrderStatus::Cooking };
        let output = f.service.edit_order(&f.client, input).await;

        assert_eq!(output.error.as_deref(), Some("Can't edit order."));
        assert!(drain(&mut updates).is_empty());
    }

    #[tokio::test]
    async fn test_edit_requires_visibility() {
        let f = fixture().await;
        let order_id = place_order(&f).await;
        let stranger = User::new("other-owner@example.com", UserRole::Owner);

        let input = EditOrderInput { id: order_id, status: OrderStatus::Cooking };
        let output = f.service.edit_order(&stranger, input).await;

        assert_eq!(output.error.as_deref(), Some("Can't see order."));
    }

    #[tokio::test]
    async fn test_unassigned_driver_cannot_edit() {
        let f = fixture().await;
        let order_id = place_order(&f).await;
        let mut updates = f.bus.order_updates(&f.client, order_id);

        let input = EditOrderInput { id: order_id, status: OrderStatus::PickedUp };
        let output = f.service.edit_order(&f.driver, input).await;

        assert_eq!(output.error.as_deref(), Some("Can't see order."));
        assert!(drain(&mut updates).is_empty());
        let order = f.store.find_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_owner_cannot_set_driver_states() {
        let f = fixture().await;
        let order_id = place_order(&f).await;

        let input = EditOrderInput { id: order_id, status: OrderStatus::PickedUp };
        let output = f.service.edit_order(&f.owner, input).await;

        assert_eq!(output.error.as_deref(), Some("Can't edit order."));
    }

    #[tokio::test]
    async fn test_status_cannot_move_backwards() {
        let f = fixture().await;
        let order_id = place_order(&f).await;
        let cooked = EditOrderInput { id: order_id, status: OrderStatus::Cooked };
        assert!(f.service.edit_order(&f.owner, cooked).await.ok);

        let back = EditOrderInput { id: order_id, status: OrderStatus::Cooking };
        let output = f.service.edit_order(&f.owner, back).await;

        assert_eq!(output.error.as_deref(), Some("Order status can only move forward."));
        let order = f.store.find_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cooked);
    }

    #[tokio::test]
    async fn test_edit_storage_failure_publishes_nothing() {
        let owner = User::new("owner@example.com", UserRole::Owner);
        let order = pending_order(owner.id);
        let order_id = order.id;

        let mut store = MockOrderStore::new();
        store.expect_find_order().returning(move |_| Ok(Some(order.clone())));
        store
            .expect_update_status()
            .returning(|_, _, _| Err(StoreError::Unavailable("pool closed".into())));
        let mut bus = MockEventBus::new();
        bus.expect_publish().never();

        let service = OrderService::new(Arc::new(store), Arc::new(bus), Arc::new(Metrics::new().unwrap()));
        let output = service
            .edit_order(&owner, EditOrderInput { id: order_id, status: OrderStatus::Cooking })
            .await;

        assert_eq!(output.error.as_deref(), Some("Could not edit order."));
    }

    #[tokio::test]
    async fn test_edit_loses_race_on_status() {
        let owner = User::new("owner@example.com", UserRole::Owner);
        let order = pending_order(owner.id);
        let order_id = order.id;

        let mut store = MockOrderStore::new();
        store.expect_find_order().returning(move |_| Ok(Some(order.clone())));
        store.expect_update_status().returning(|_, _, _| Ok(None));
        let mut bus = MockEventBus::new();
        bus.expect_publish().never();

        let service = OrderService::new(Arc::new(store), Arc::new(bus), Arc::new(Metrics::new().unwrap()));
        let output = service
            .edit_order(&owner, EditOrderInput { id: order_id, status: OrderStatus::Cooking })
            .await;

        assert_eq!(output.error.as_deref(), Some("Order status changed, try again."));
    }

    // ------------------------------------------------------------------------
    // take_order
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_take_order_assigns_driver_once() {
        let f = fixture().await;
        let order_id = place_order(&f).await;
        let second = User::new("second@example.com", UserRole::Delivery);
        let mut updates = f.bus.order_updates(&f.client, order_id);

        let first = f.service.take_order(&f.driver, TakeOrderInput { id: order_id }).await;
        assert!(first.ok, "{:?}", first.error);

        let again = f.service.take_order(&second, TakeOrderInput { id: order_id }).await;
        assert_eq!(again.error.as_deref(), Some("This order already has a driver"));

        let order = f.store.find_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.driver_id, Some(f.driver.id));
        assert_eq!(drain(&mut updates).len(), 1);
        assert_eq!(f.metrics.drivers_assigned.get(), 1);
    }

    #[tokio::test]
    async fn test_take_order_makes_order_visible_to_driver() {
        let f = fixture().await;
        let order_id = place_order(&f).await;

        f.service.take_order(&f.driver, TakeOrderInput { id: order_id }).await;
        let output = f.service.get_order(&f.driver, GetOrderInput { id: order_id }).await;

        assert!(output.core.ok);
    }

    #[tokio::test]
    async fn test_take_order_requires_delivery_role() {
        let f = fixture().await;
        let order_id = place_order(&f).await;

        let output = f.service.take_order(&f.client, TakeOrderInput { id: order_id }).await;

        assert_eq!(output.error.as_deref(), Some("Forbidden resource"));
    }

    #[tokio::test]
    async fn test_take_order_not_found() {
        let f = fixture().await;

        let output = f.service.take_order(&f.driver, TakeOrderInput { id: Uuid::new_v4() }).await;

        assert_eq!(output.error.as_deref(), Some("Order not found"));
    }

    #[tokio::test]
    async fn test_take_order_lost_race_is_conflict() {
        let driver = User::new("driver@example.com", UserRole::Delivery);
        let order = pending_order(Uuid::new_v4());
        let order_id = order.id;

        let mut store = MockOrderStore::new();
        store.expect_find_order().returning(move |_| Ok(Some(order.clone())));
        store.expect_assign_driver().times(1).returning(|_, _| Ok(None));
        let mut bus = MockEventBus::new();
        bus.expect_publish().never();

        let service = OrderService::new(Arc::new(store), Arc::new(bus), Arc::new(Metrics::new().unwrap()));
        let output = service.take_order(&driver, TakeOrderInput { id: order_id }).await;

        assert_eq!(output.error.as_deref(), Some("This order already has a driver"));
    }

    #[tokio::test]
    async fn test_take_order_storage_failure_message() {
        let driver = User::new("driver@example.com", UserRole::Delivery);
        let mut store = MockOrderStore::new();
        store
            .expect_find_order()
            .returning(|_| Err(StoreError::Unavailable("timeout".into())));
        let mut bus = MockEventBus::new();
        bus.expect_publish().never();

        let service = OrderService::new(Arc::new(store), Arc::new(bus), Arc::new(Metrics::new().unwrap()));
        let output = service.take_order(&driver, TakeOrderInput { id: Uuid::new_v4() }).await;

        assert_eq!(output.error.as_deref(), Some("Could not upate order."));
    }
}
