// ============================================================================
// Domain Events - per-aggregate registry
// ============================================================================

pub mod registry;
pub mod types;

pub use registry::DomainEvents;
pub use types::{
    domain_event_handler, BatchOutcome, DomainEvent, DomainEventHandler, DomainEventOptions,
    DomainMetrics, EventInvocation, MIN_DEFAULT_PRIORITY,
};
