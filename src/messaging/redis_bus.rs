use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

use super::{EventBus, EventEnvelope, PublishError};

/// Publishes envelopes as JSON with `PUBLISH <topic> <payload>`. One
/// multiplexed connection keeps publish order for a single bus handle.
///
/// This bus is publish-only. Consumers in other processes `SUBSCRIBE` to the
/// channel named after each topic and apply their own filters. The filtered
/// `pending_orders` / `cooked_orders` / `order_updates` subscriptions are
/// served by [`InMemoryEventBus`](super::InMemoryEventBus) within a process.
pub struct RedisEventBus {
    connection: MultiplexedConnection,
    circuit_breaker: CircuitBreaker,
}

impl RedisEventBus {
    pub async fn connect(url: &str) -> Result<Self, PublishError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;

        tracing::info!("Connected to Redis event bus");

        Ok(Self {
            connection,
            circuit_breaker: CircuitBreaker::new("redis-event-bus", CircuitBreakerConfig::default()),
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, envelope: EventEnvelope) -> Result<usize, PublishError> {
        let payload = envelope.to_json()?;
        let channel = envelope.topic.as_str();
        let mut connection = self.connection.clone();

        let result = self
            .circuit_breaker
            .call(async move { connection.publish::<_, _, usize>(channel, payload).await })
            .await;

        match result {
            Ok(receivers) => {
                tracing::debug!(
                    topic = %channel,
                    order_id = %envelope.order_id,
                    receivers,
                    "Published to Redis"
                );
                Ok(receivers)
            }
            Err(CircuitBreakerError::Open) => {
                tracing::error!(topic = %channel, "Circuit breaker open - Redis unavailable");
                Err(PublishError::CircuitOpen)
            }
            Err(CircuitBreakerError::Inner(e)) => {
                tracing::error!(error = %e, topic = %channel, "Failed to publish to Redis");
                Err(PublishError::Redis(e))
            }
        }
    }
}
