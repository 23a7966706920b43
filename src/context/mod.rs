// ============================================================================
// Event Context
// ============================================================================
//
// Process-wide, in-process event channel shared by every aggregate.
// Two strategies: a server flavor over an EventTransport and a browser
// flavor over a BrowserHost. The strategy is picked once from an explicit
// Environment.
//
// ============================================================================

pub mod browser;
pub mod event;
pub mod manager;
pub mod name;
pub mod server;
pub mod transport;

pub use browser::{
    BrowserEventManager, BrowserHost, CustomEvent, InMemoryBrowserHost, MemorySessionStorage,
    SessionStorage, BEFORE_UNLOAD,
};
pub use event::{context_handler, ContextEvent, ContextHandler, EventRecord};
pub use manager::{
    build_event_context, create_event_context, ContextFlavor, Environment, EventContextManager,
};
pub use name::{
    is_wildcard, validate_event_name, validate_literal_event_name, WildcardPattern,
    WILDCARD_EVENT_ALIAS,
};
pub use server::ServerEventManager;
pub use transport::{EventTransport, InProcessEmitter};
