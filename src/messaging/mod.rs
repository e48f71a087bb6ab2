// ============================================================================
// Messaging - order event fan-out
// ============================================================================
//
// The order service publishes through the `EventBus` handle it was built
// with; there is no global bus.
//
// - envelope.rs      - metadata wrapper and wire format
// - memory.rs        - in-process broadcast bus (supports subscriptions)
// - redis_bus.rs     - Redis PUBLISH bus behind a circuit breaker
// - subscriptions.rs - per-subscriber filtering of topics
//
// ============================================================================

mod envelope;
mod memory;
mod redis_bus;
mod subscriptions;

pub use envelope::EventEnvelope;
pub use memory::InMemoryEventBus;
pub use redis_bus::RedisEventBus;
pub use subscriptions::Subscription;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Circuit breaker open, event bus unavailable")]
    CircuitOpen,
}

/// Best-effort fan-out of order events. Events published through one handle
/// reach subscribers of a topic in publish order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Returns how many subscribers received the event. Zero subscribers is
    /// not an error.
    async fn publish(&self, envelope: EventEnvelope) -> Result<usize, PublishError>;
}
