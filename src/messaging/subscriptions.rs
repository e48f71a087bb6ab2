use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::domain::order::Topic;

use super::EventEnvelope;

type Filter = Box<dyn Fn(&EventEnvelope) -> bool + Send + Sync>;

/// A filtered view of one topic for one subscriber.
pub struct Subscription {
    topic: Topic,
    receiver: broadcast::Receiver<Arc<EventEnvelope>>,
    filter: Filter,
}

impl Subscription {
    pub(super) fn new(topic: Topic, receiver: broadcast::Receiver<Arc<EventEnvelope>>, filter: Filter) -> Self {
        Self { topic, receiver, filter }
    }

    /// Wait for the next matching event. `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<Arc<EventEnvelope>> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if (self.filter)(&envelope) => return Some(envelope),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event that is already buffered, without waiting.
    pub fn try_next(&mut self) -> Option<Arc<EventEnvelope>> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if (self.filter)(&envelope) => return Some(envelope),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "Subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
