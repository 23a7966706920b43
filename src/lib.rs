// ============================================================================
// domain_kit - event-sourced aggregate coordination
// ============================================================================
//
// - context:  process-wide Event Context (server / browser flavors)
// - domain:   identity, aggregates, per-aggregate event registries, ports
// - infra:    mapper port between aggregates and storage shapes
// - config:   aggregate configuration (debug, metrics reset, wiring)
// - metrics:  Prometheus counters for event dispatch
// - utils:    handler isolation
//
// ============================================================================

pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod infra;
pub mod metrics;
pub mod utils;

pub use config::AggregateConfig;
pub use context::{
    build_event_context, create_event_context, ContextEvent, Environment, EventContextManager,
};
pub use domain::aggregate::{
    aggregate_event_handler, Aggregate, AggregateEventHandlers, AggregateState,
};
pub use domain::entity::{EntityProps, UniqueId};
pub use domain::events::{domain_event_handler, DomainEventOptions, DomainEvents};
pub use error::{DomainError, DomainResult};
pub use metrics::EventMetrics;
