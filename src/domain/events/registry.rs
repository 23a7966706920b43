use futures_util::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use super::types::{
    BatchOutcome, DomainEvent, DomainEventHandler, DomainEventOptions, DomainMetrics,
    EventInvocation,
};
use crate::context::{validate_event_name, validate_literal_event_name};
use crate::error::DomainResult;
use crate::metrics::{EventMetrics, REGISTRY_MECHANISM};
use crate::utils::start_isolated;

// ============================================================================
// Domain Event Registry - per-aggregate handler table
// ============================================================================
//
// - One handler per name (re-adding a name replaces it)
// - `dispatch` is single-shot: the handler is unregistered as it fires
// - `dispatch_events` fires everything in ascending priority, joins the
//   handlers concurrently and always empties the registry afterwards
//
// Independent of the process-wide event context and of the handler table
// embedded in AggregateState.
//
// ============================================================================

struct RegistryState<A> {
    events: Vec<DomainEvent<A>>,
    total_dispatched: u64,
    registrations: u64,
}

pub struct DomainEvents<A> {
    aggregate: A,
    state: Mutex<RegistryState<A>>,
    metrics: Option<Arc<EventMetrics>>,
}

impl<A> DomainEvents<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Registry whose handlers receive `aggregate` on every call
    pub fn new(aggregate: A) -> Self {
        Self {
            aggregate,
            state: Mutex::new(RegistryState {
                events: Vec::new(),
                total_dispatched: 0,
                registrations: 0,
            }),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<EventMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn aggregate(&self) -> &A {
        &self.aggregate
    }

    /// Register `handler` under `name`, replacing any previous registration.
    ///
    /// Without explicit options the priority is `max(2, registrations so far)`.
    pub fn add(
        &self,
        name: &str,
        handler: DomainEventHandler<A>,
        options: Option<DomainEventOptions>,
    ) -> DomainResult<()> {
        validate_literal_event_name(name)?;

        let (before, after) = {
            let mut state = self.state.lock();
            let before = state.events.len();
            let options =
                options.unwrap_or_else(|| DomainEventOptions::default_for(state.registrations));
            state.registrations += 1;

            state.events.retain(|e| e.name != name);
            state.events.push(DomainEvent {
                name: name.to_string(),
                handler,
                options,
            });

            tracing::debug!(event = %name, priority = options.priority, "Domain event registered");
            (before, state.events.len())
        };

        self.report_registered(before, after);
        Ok(())
    }

    /// Drop the registration for `name`; true when one existed
    pub fn remove(&self, name: &str) -> DomainResult<bool> {
        validate_event_name(name)?;

        let (before, after) = {
            let mut state = self.state.lock();
            let before = state.events.len();
            state.events.retain(|e| e.name != name);
            (before, state.events.len())
        };

        self.report_registered(before, after);
        Ok(after != before)
    }

    pub fn clear(&self) {
        let before = {
            let mut state = self.state.lock();
            let before = state.events.len();
            state.events.clear();
            before
        };
        self.report_registered(before, 0);
    }

    /// Fire the handler registered under exactly `name`, once.
    ///
    /// The registration is removed before the handler runs, so a second
    /// dispatch is a no-op unless the name is added again. Returns whether a
    /// handler fired.
    pub async fn dispatch(&self, name: &str, args: Vec<Value>) -> DomainResult<bool> {
        validate_event_name(name)?;

        let (event, total) = {
            let mut state = self.state.lock();
            let Some(index) = state.events.iter().position(|e| e.name == name) else {
                return Ok(false);
            };
            let event = state.events.remove(index);
            state.total_dispatched += 1;
            (event, state.events.len())
        };
        self.report_registered(total + 1, total);

        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(REGISTRY_MECHANISM, 1);
        }

        let invocation = EventInvocation {
            name: event.name.clone(),
            options: event.options,
            args,
        };
        let aggregate = self.aggregate.clone();
        let handler = Arc::clone(&event.handler);

        if let Err(failure) = start_isolated(move || handler(aggregate, invocation)).await {
            tracing::error!(event = %name, error = %failure, "Domain event handler failed");
            if let Some(metrics) = &self.metrics {
                metrics.record_handler_failure(REGISTRY_MECHANISM);
            }
        }

        Ok(true)
    }

    /// Fire every registered handler in ascending priority, wait for all of
    /// them, then empty the registry whatever their outcome.
    pub async fn dispatch_events(&self) -> BatchOutcome {
        let mut batch = {
            let mut state = self.state.lock();
            state.total_dispatched += state.events.len() as u64;
            state.events.clone()
        };
        // Stable: equal priorities keep registration order
        batch.sort_by_key(|e| e.options.priority);

        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(REGISTRY_MECHANISM, batch.len() as u64);
        }

        let runs: Vec<_> = batch
            .iter()
            .map(|event| {
                let handler = Arc::clone(&event.handler);
                let aggregate = self.aggregate.clone();
                let invocation = EventInvocation {
                    name: event.name.clone(),
                    options: event.options,
                    args: Vec::new(),
                };
                start_isolated(move || handler(aggregate, invocation))
            })
            .collect();

        let outcomes = join_all(runs).await;

        let mut failed = 0;
        for (event, outcome) in batch.iter().zip(outcomes) {
            if let Err(failure) = outcome {
                failed += 1;
                tracing::error!(
                    event = %event.name,
                    error = %failure,
                    "Domain event handler failed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_handler_failure(REGISTRY_MECHANISM);
                }
            }
        }

        self.clear();

        tracing::debug!(invoked = batch.len(), failed, "Domain events dispatched");
        BatchOutcome {
            invoked: batch.len(),
            failed,
        }
    }

    pub fn metrics(&self) -> DomainMetrics {
        let state = self.state.lock();
        DomainMetrics {
            total_dispatched: state.total_dispatched,
            total_events: state.events.len(),
        }
    }

    /// Registered events in registration order
    pub fn events(&self) -> Vec<DomainEvent<A>> {
        self.state.lock().events.clone()
    }

    fn report_registered(&self, before: usize, after: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.adjust_registered(after as i64 - before as i64);
        }
    }
}

impl<A> Drop for DomainEvents<A> {
    fn drop(&mut self) {
        if let Some(metrics) = &self.metrics {
            let remaining = self.state.get_mut().events.len();
            metrics.adjust_registered(-(remaining as i64));
        }
    }
}
