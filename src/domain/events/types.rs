use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::utils::HandlerFuture;

/// Lowest default priority handed out to handlers registered without one
pub const MIN_DEFAULT_PRIORITY: u32 = 2;

/// Lower priority dispatches first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainEventOptions {
    pub priority: u32,
}

impl DomainEventOptions {
    pub fn with_priority(priority: u32) -> Self {
        Self { priority }
    }

    /// Default for the `registrations`-th handler: `max(2, registrations)`
    pub fn default_for(registrations: u64) -> Self {
        let priority = u32::try_from(registrations).unwrap_or(u32::MAX);
        Self {
            priority: priority.max(MIN_DEFAULT_PRIORITY),
        }
    }
}

/// What a registry handler receives alongside the aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct EventInvocation {
    pub name: String,
    pub options: DomainEventOptions,
    pub args: Vec<Value>,
}

pub type DomainEventHandler<A> = Arc<dyn Fn(A, EventInvocation) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a [`DomainEventHandler`]
pub fn domain_event_handler<A, F, Fut>(handler: F) -> DomainEventHandler<A>
where
    F: Fn(A, EventInvocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |aggregate, invocation| handler(aggregate, invocation).boxed())
}

/// A named handler registered in a Domain Event Registry
pub struct DomainEvent<A> {
    pub name: String,
    pub handler: DomainEventHandler<A>,
    pub options: DomainEventOptions,
}

impl<A> Clone for DomainEvent<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: Arc::clone(&self.handler),
            options: self.options,
        }
    }
}

impl<A> fmt::Debug for DomainEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainEvent")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a registry's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DomainMetrics {
    /// Monotonic count of handlers fired
    pub total_dispatched: u64,
    /// Handlers currently registered
    pub total_events: usize,
}

/// Outcome of a batch dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub invoked: usize,
    pub failed: usize,
}
