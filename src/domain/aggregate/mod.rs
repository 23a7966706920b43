// ============================================================================
// Aggregate State Machine
// ============================================================================
//
// - state:    immutable AggregateState snapshot and clone helper
// - handlers: pure event operations threaded through transitions
// - root:     the Aggregate wrapper holding the current state
//
// ============================================================================

pub mod handlers;
pub mod root;
pub mod state;

pub use handlers::AggregateEventHandlers;
pub use root::Aggregate;
pub use state::{
    aggregate_event_handler, clone_aggregate, AggregateEventHandler, AggregateState, CloneOptions,
    DomainEventsState, EmittedEvent, NamedEventHandler, RegisteredHandler,
};
