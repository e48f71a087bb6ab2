use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::domain::order::{OrderEvent, Topic};

// ============================================================================
// Event Envelope - metadata wrapped around every published order event
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    // Event Identity
    pub event_id: Uuid,
    pub order_id: Uuid,

    // Routing
    pub topic: Topic,
    pub event_type: String,

    // Event Payload
    pub payload: OrderEvent,

    // Who triggered this event
    pub actor_id: Option<Uuid>,

    // Timing
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(payload: OrderEvent) -> Self {
        Self {
            // v7 ids sort by creation time
            event_id: Uuid::now_v7(),
            order_id: payload.order_id(),
            topic: payload.topic(),
            event_type: payload.event_type().to_string(),
            payload,
            actor_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
