use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for event dispatch
// ============================================================================
//
// Counts dispatches and handler failures for the two aggregate-side event
// mechanisms, labelled by `mechanism`:
// - "registry":  per-aggregate Domain Event Registry (single-shot / batch)
// - "aggregate": handler table embedded in the aggregate state
//
// Handlers currently registered are tracked for registries only, summed over
// every registry sharing this EventMetrics. Aggregate handler tables are
// immutable snapshots that a failed update discards, so they have no live
// count.
//
// ============================================================================

pub const REGISTRY_MECHANISM: &str = "registry";
pub const AGGREGATE_MECHANISM: &str = "aggregate";

pub struct EventMetrics {
    registry: Registry,

    pub events_dispatched: IntCounterVec,
    pub handler_failures: IntCounterVec,
    pub registry_events_registered: IntGauge,
}

impl EventMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_dispatched = IntCounterVec::new(
            Opts::new("domain_events_dispatched_total", "Total domain events dispatched"),
            &["mechanism"],
        )?;
        registry.register(Box::new(events_dispatched.clone()))?;

        let handler_failures = IntCounterVec::new(
            Opts::new(
                "domain_event_handler_failures_total",
                "Total domain event handlers that failed or panicked",
            ),
            &["mechanism"],
        )?;
        registry.register(Box::new(handler_failures.clone()))?;

        let registry_events_registered = IntGauge::with_opts(Opts::new(
            "domain_registry_events_registered",
            "Handlers currently registered across all Domain Event Registries",
        ))?;
        registry.register(Box::new(registry_events_registered.clone()))?;

        Ok(Self {
            registry,
            events_dispatched,
            handler_failures,
            registry_events_registered,
        })
    }

    /// Get the Prometheus registry for exposing metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_dispatch(&self, mechanism: &str, count: u64) {
        self.events_dispatched.with_label_values(&[mechanism]).inc_by(count);
    }

    pub fn record_handler_failure(&self, mechanism: &str) {
        self.handler_failures.with_label_values(&[mechanism]).inc();
    }

    /// Apply a change in the number of registry handlers
    pub fn adjust_registered(&self, delta: i64) {
        if delta != 0 {
            self.registry_events_registered.add(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = EventMetrics::new().unwrap();
        metrics.record_dispatch(REGISTRY_MECHANISM, 1);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_dispatch_by_mechanism() {
        let metrics = EventMetrics::new().unwrap();
        metrics.record_dispatch(REGISTRY_MECHANISM, 3);
        metrics.record_dispatch(AGGREGATE_MECHANISM, 1);

        let registry = metrics.events_dispatched.with_label_values(&[REGISTRY_MECHANISM]);
        let aggregate = metrics.events_dispatched.with_label_values(&[AGGREGATE_MECHANISM]);
        assert_eq!(registry.get(), 3);
        assert_eq!(aggregate.get(), 1);
    }

    #[test]
    fn test_failures_and_registered_gauge() {
        let metrics = EventMetrics::new().unwrap();
        metrics.record_handler_failure(AGGREGATE_MECHANISM);
        metrics.adjust_registered(4);
        metrics.adjust_registered(-2);

        assert_eq!(
            metrics.handler_failures.with_label_values(&[AGGREGATE_MECHANISM]).get(),
            1
        );
        assert_eq!(metrics.registry_events_registered.get(), 2);
    }
}
