use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::handlers::AggregateEventHandlers;
use super::state::AggregateState;
use crate::config::AggregateConfig;
use crate::context::{create_event_context, Environment, EventContextManager};
use crate::domain::entity::{EntityProps, UniqueId};
use crate::domain::events::DomainEvents;
use crate::error::{DomainError, DomainResult};

// ============================================================================
// Aggregate - controlled mutation surface over AggregateState
// ============================================================================
//
// Holds exactly one current state. `update` runs a transition on a copy and
// swaps the result in only once the transition has finished successfully;
// a failed transition leaves the current state untouched. Updates are
// serialized so two transitions never race on the same base state.
//
// ============================================================================

pub struct Aggregate<P> {
    state: RwLock<AggregateState<P>>,
    update_gate: tokio::sync::Mutex<()>,
    context: Arc<dyn EventContextManager>,
}

impl<P> Aggregate<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// New aggregate with a generated id
    pub fn create(
        type_name: impl Into<String>,
        props: P,
        config: AggregateConfig,
    ) -> DomainResult<Self> {
        Self::from_props(type_name, EntityProps::new(props), config)
    }

    /// New aggregate with a caller-supplied id
    pub fn create_with_id(
        type_name: impl Into<String>,
        id: impl Into<UniqueId>,
        props: P,
        config: AggregateConfig,
    ) -> DomainResult<Self> {
        Self::from_props(type_name, EntityProps::with_id(Some(id.into()), props), config)
    }

    /// New aggregate from full props.
    ///
    /// Binds to `config.context` when given, otherwise to the process-wide
    /// context (created on first use over `config.emitter`).
    pub fn from_props(
        type_name: impl Into<String>,
        props: EntityProps<P>,
        config: AggregateConfig,
    ) -> DomainResult<Self> {
        let context = match &config.context {
            Some(context) => Arc::clone(context),
            None => create_event_context(&Environment::Server {
                emitter: Arc::clone(&config.emitter),
            })?,
        };

        let type_name = type_name.into();
        tracing::debug!(aggregate = %type_name, id = %props.id(), "Aggregate created");

        Ok(Self {
            state: RwLock::new(AggregateState::new(type_name, props, Arc::new(config))),
            update_gate: tokio::sync::Mutex::new(()),
            context,
        })
    }

    /// Snapshot of the current state
    pub fn get_state(&self) -> AggregateState<P> {
        self.state.read().clone()
    }

    pub fn get_context(&self) -> Arc<dyn EventContextManager> {
        Arc::clone(&self.context)
    }

    pub fn id(&self) -> UniqueId {
        self.state.read().id().clone()
    }

    pub fn hash_code(&self) -> UniqueId {
        self.state.read().hash_code()
    }

    /// Run `transition` on a copy of the current state and install the
    /// state it returns.
    ///
    /// On error, or when the transition changed the aggregate's id, the
    /// current state is kept as it was.
    pub async fn update<F, Fut>(&self, transition: F) -> DomainResult<&Self>
    where
        F: FnOnce(AggregateState<P>, AggregateEventHandlers) -> Fut,
        Fut: Future<Output = anyhow::Result<AggregateState<P>>>,
    {
        let _gate = self.update_gate.lock().await;

        let current = self.get_state();
        let id = current.id().clone();

        let next = transition(current, AggregateEventHandlers)
            .await
            .map_err(DomainError::TransitionFailed)?;

        if next.id() != &id {
            return Err(DomainError::IdentityChanged {
                from: id,
                to: next.id().clone(),
            });
        }

        *self.state.write() = next;
        Ok(self)
    }

    /// Domain Event Registry whose handlers receive this aggregate
    pub fn event_registry(self: &Arc<Self>) -> DomainEvents<Arc<Self>> {
        let registry = DomainEvents::new(Arc::clone(self));
        match self.state.read().config().metrics.clone() {
            Some(metrics) => registry.with_metrics(metrics),
            None => registry,
        }
    }
}

impl<P> Aggregate<P>
where
    P: Clone + Serialize + Send + Sync + 'static,
{
    pub fn to_object(&self) -> serde_json::Result<Value> {
        self.state.read().props.to_object()
    }
}
