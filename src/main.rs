use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use food_orders::config::{AppConfig, EventBusBackend};
use food_orders::domain::catalog::{Dish, DishChoice, DishOption, Restaurant};
use food_orders::domain::order::{
    CreateOrderInput, CreateOrderItemInput, EditOrderInput, GetOrderInput, GetOrdersInput, Money,
    OrderItemOption, OrderService, OrderStatus, TakeOrderInput, Topic,
};
use food_orders::domain::user::{User, UserRole};
use food_orders::messaging::{EventBus, InMemoryEventBus, RedisEventBus};
use food_orders::metrics::{self, Metrics};
use food_orders::store::{self, CatalogStore, PgOrderStore};
use food_orders::utils::{retry_with_backoff, RetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
        .init();

    tracing::info!(environment = %config.environment, "Starting food ordering service");

    // === 1. PostgreSQL ===
    tracing::info!("Connecting to PostgreSQL...");
    let pool = retry_with_backoff("postgres", &RetryConfig::default(), |_| store::connect(&config.database)).await?;
    let store = Arc::new(PgOrderStore::new(pool));
    store.migrate().await?;

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    if config.metrics.enabled {
        let registry = Arc::new(metrics.registry().clone());
        let port = config.metrics.port;
        std::thread::spawn(move || {
            let system = actix_web::rt::System::new();
            if let Err(e) = system.block_on(metrics::start_metrics_server(registry, port)) {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    }

    // === 3. Event bus ===
    let bus: Arc<dyn EventBus> = match config.event_bus.backend {
        EventBusBackend::Memory => {
            let bus = InMemoryEventBus::new(config.event_bus.channel_capacity);
            spawn_update_logger(&bus);
            Arc::new(bus)
        }
        EventBusBackend::Redis => {
            let url = config.event_bus.redis_url.clone();
            let bus = retry_with_backoff("redis", &RetryConfig::default(), |_| RedisEventBus::connect(&url)).await?;
            Arc::new(bus)
        }
    };

    // === 4. Order service ===
    let service = OrderService::new(store.clone(), bus, metrics.clone());

    // === 5. Demonstrate the order lifecycle ===
    run_lifecycle(&service, store.as_ref()).await?;

    tracing::info!("Demo complete");

    Ok(())
}

/// Log every order event seen on the in-process bus.
fn spawn_update_logger(bus: &InMemoryEventBus) {
    for topic in Topic::ALL {
        let mut subscription = bus.subscribe(topic);
        tokio::spawn(async move {
            while let Some(envelope) = subscription.next().await {
                tracing::info!(
                    topic = %envelope.topic,
                    order_id = %envelope.order_id,
                    event_type = %envelope.event_type,
                    "Order event"
                );
            }
        });
    }
}

async fn run_lifecycle(service: &OrderService, catalog: &dyn CatalogStore) -> anyhow::Result<()> {
    // Emails are unique; tag them per run so the demo can be repeated.
    let run = uuid::Uuid::new_v4().simple().to_string();
    let run = &run[..8];
    let owner = User::new(format!("owner+{run}@example.com"), UserRole::Owner);
    let client = User::new(format!("client+{run}@example.com"), UserRole::Client);
    let driver = User::new(format!("driver+{run}@example.com"), UserRole::Delivery);
    for user in [&owner, &client, &driver] {
        catalog.save_user(user).await?;
    }

    let restaurant = Restaurant::new("Trattoria", owner.id);
    catalog.save_restaurant(&restaurant).await?;

    let pizza = Dish::new(restaurant.id, "Margherita", Money::from_cents(1000))
        .with_option(DishOption::flat("Extra cheese", Money::from_cents(150)))
        .with_option(DishOption::with_choices(
            "Size",
            vec![
                DishChoice { name: "Regular".into(), extra: None },
                DishChoice { name: "Large".into(), extra: Some(Money::from_cents(200)) },
            ],
        ));
    catalog.save_dish(&pizza).await?;

    let created = service
        .create_order(
            &client,
            CreateOrderInput {
                restaurant_id: restaurant.id,
                items: vec![CreateOrderItemInput {
                    dish_id: pizza.id,
                    options: vec![OrderItemOption::with_choice("Size", "Large")],
                }],
            },
        )
        .await;

    let Some(order_id) = created.order_id else {
        anyhow::bail!("Order creation failed: {:?}", created.core.error);
    };
    tracing::info!(%order_id, "Order created");

    for status in [OrderStatus::Cooking, OrderStatus::Cooked] {
        let output = service.edit_order(&owner, EditOrderInput { id: order_id, status }).await;
        tracing::info!(%order_id, %status, ok = output.ok, error = ?output.error, "Owner edit");
    }

    let taken = service.take_order(&driver, TakeOrderInput { id: order_id }).await;
    tracing::info!(%order_id, ok = taken.ok, error = ?taken.error, "Driver took order");

    for status in [OrderStatus::PickedUp, OrderStatus::Delivered] {
        let output = service.edit_order(&driver, EditOrderInput { id: order_id, status }).await;
        tracing::info!(%order_id, %status, ok = output.ok, error = ?output.error, "Driver edit");
    }

    let order = service.get_order(&client, GetOrderInput { id: order_id }).await;
    if let Some(order) = order.order {
        tracing::info!(%order_id, status = %order.status, total = %order.total, "Final order state");
    }

    let history = service.get_orders(&client, GetOrdersInput::default()).await;
    tracing::info!(count = history.orders.map_or(0, |orders| orders.len()), "Client order history");

    // Let the event logger drain
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    Ok(())
}
