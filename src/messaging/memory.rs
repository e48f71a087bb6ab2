use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::order::errors::{OrderError, FORBIDDEN_RESOURCE};
use crate::domain::order::{policy, OrderEvent, Topic};
use crate::domain::user::{User, UserRole};

use super::subscriptions::Subscription;
use super::{EventBus, EventEnvelope, PublishError};

// ============================================================================
// In-process event bus
// ============================================================================
//
// One broadcast channel per topic, created up front. Broadcast channels keep
// per-sender order, so every subscriber of a topic sees events in the order
// they were published.
//
// ============================================================================

#[derive(Clone)]
pub struct InMemoryEventBus {
    channels: Arc<HashMap<Topic, broadcast::Sender<Arc<EventEnvelope>>>>,
}

impl InMemoryEventBus {
    pub fn new(capacity: usize) -> Self {
        let channels = Topic::ALL
            .into_iter()
            .map(|topic| (topic, broadcast::channel(capacity).0))
            .collect();
        Self { channels: Arc::new(channels) }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Arc<EventEnvelope>> {
        // Every topic gets a channel in `new`.
        &self.channels[&topic]
    }

    /// Raw subscription to a topic without filtering.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        Subscription::new(topic, self.sender(topic).subscribe(), Box::new(|_| true))
    }

    /// New orders for restaurants owned by `owner`.
    pub fn pending_orders(&self, owner: &User) -> Result<Subscription, OrderError> {
        if !policy::has_role(owner, UserRole::Owner) {
            return Err(OrderError::Forbidden(FORBIDDEN_RESOURCE));
        }
        let owner_id = owner.id;
        let receiver = self.sender(Topic::PendingOrders).subscribe();
        Ok(Subscription::new(
            Topic::PendingOrders,
            receiver,
            Box::new(move |envelope| match &envelope.payload {
                OrderEvent::PendingOrderCreated(event) => event.owner_id == owner_id,
                _ => false,
            }),
        ))
    }

    /// Orders that just became ready for pickup. Drivers only.
    pub fn cooked_orders(&self, driver: &User) -> Result<Subscription, OrderError> {
        if !policy::has_role(driver, UserRole::Delivery) {
            return Err(OrderError::Forbidden(FORBIDDEN_RESOURCE));
        }
        Ok(self.subscribe(Topic::CookedOrders))
    }

    /// Updates to one order, delivered only while `user` can see it.
    pub fn order_updates(&self, user: &User, order_id: Uuid) -> Subscription {
        let user = user.clone();
        let receiver = self.sender(Topic::OrderUpdates).subscribe();
        Subscription::new(
            Topic::OrderUpdates,
            receiver,
            Box::new(move |envelope| {
                envelope.order_id == order_id && policy::can_see_order(&user, envelope.payload.order())
            }),
        )
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, envelope: EventEnvelope) -> Result<usize, PublishError> {
        let topic = envelope.topic;
        // SendError only means nobody is listening right now.
        let delivered = self.sender(topic).send(Arc::new(envelope)).unwrap_or(0);
        tracing::trace!(topic = %topic, delivered, "Published to in-process bus");
        Ok(delivered)
    }
}
