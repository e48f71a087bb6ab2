// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

use crate::domain::order::{ErrorKind, OrderStatus, Topic};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics - Prometheus metrics for the ordering subsystem
// ============================================================================
//
// - orders created, status transitions, driver assignments
// - events published / failed per topic
// - operation latency and failures by kind
//
// Scraped via /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_created: IntCounter,
    pub status_transitions: IntCounterVec,
    pub drivers_assigned: IntCounter,

    pub events_published: IntCounterVec,
    pub event_publish_failures: IntCounterVec,

    pub operation_failures: IntCounterVec,
    pub operation_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new("order_status_transitions_total", "Order status changes"),
            &["from", "to"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let drivers_assigned = IntCounter::new("drivers_assigned_total", "Drivers assigned to orders")?;
        registry.register(Box::new(drivers_assigned.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("order_events_published_total", "Order events published"),
            &["topic"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let event_publish_failures = IntCounterVec::new(
            Opts::new("order_event_publish_failures_total", "Order events that failed to publish"),
            &["topic"],
        )?;
        registry.register(Box::new(event_publish_failures.clone()))?;

        let operation_failures = IntCounterVec::new(
            Opts::new("order_operation_failures_total", "Failed order operations"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(operation_failures.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("order_operation_duration_seconds", "Order operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            status_transitions,
            drivers_assigned,
            events_published,
            event_publish_failures,
            operation_failures,
            operation_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_operation(&self, operation: &str, duration_secs: f64, failure: Option<ErrorKind>) {
        self.operation_duration.with_label_values(&[operation]).observe(duration_secs);
        if let Some(kind) = failure {
            self.operation_failures.with_label_values(&[operation, kind.as_str()]).inc();
        }
    }

    pub fn record_transition(&self, from: OrderStatus, to: OrderStatus) {
        self.status_transitions.with_label_values(&[from.as_str(), to.as_str()]).inc();
    }

    pub fn record_publish(&self, topic: Topic, success: bool) {
        if success {
            self.events_published.with_label_values(&[topic.as_str()]).inc();
        } else {
            self.event_publish_failures.with_label_values(&[topic.as_str()]).inc();
        }
    }
}
