use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::config::AggregateConfig;
use crate::domain::entity::{EntityProps, UniqueId};
use crate::domain::events::DomainEventOptions;
use crate::utils::HandlerFuture;

/// Handler stored in the aggregate's own event table; receives the
/// dispatched arguments.
pub type AggregateEventHandler = Arc<dyn Fn(Vec<Value>) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as an [`AggregateEventHandler`]
pub fn aggregate_event_handler<F, Fut>(handler: F) -> AggregateEventHandler
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |args| handler(args).boxed())
}

#[derive(Clone)]
pub struct RegisteredHandler {
    pub handler: AggregateEventHandler,
    pub options: DomainEventOptions,
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Self-describing handler: name, callback and options in one value
#[derive(Clone)]
pub struct NamedEventHandler {
    pub name: String,
    pub handler: AggregateEventHandler,
    pub options: Option<DomainEventOptions>,
}

impl NamedEventHandler {
    pub fn new(name: impl Into<String>, handler: AggregateEventHandler) -> Self {
        Self {
            name: name.into(),
            handler,
            options: None,
        }
    }

    pub fn with_options(mut self, options: DomainEventOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// One entry of the `emitted` history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmittedEvent {
    pub name: String,
    pub args: Vec<Value>,
    pub emitted_at: DateTime<Utc>,
}

/// Handler table plus dispatch history, embedded in [`AggregateState`]
#[derive(Debug, Clone, Default)]
pub struct DomainEventsState {
    pub(crate) handlers: BTreeMap<String, Vec<RegisteredHandler>>,
    pub(crate) emitted: Vec<EmittedEvent>,
    /// Monotonic registration counter used for default priorities
    pub(crate) registrations: u64,
}

impl DomainEventsState {
    pub fn handlers(&self) -> &BTreeMap<String, Vec<RegisteredHandler>> {
        &self.handlers
    }

    pub fn handlers_for(&self, name: &str) -> &[RegisteredHandler] {
        self.handlers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn emitted(&self) -> &[EmittedEvent] {
        &self.emitted
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

/// Immutable snapshot of an aggregate.
///
/// Only `props` is writable by transitions; the event table and counter change
/// through [`AggregateEventHandlers`](super::AggregateEventHandlers).
#[derive(Debug, Clone)]
pub struct AggregateState<P> {
    type_name: String,
    pub props: EntityProps<P>,
    pub(crate) domain_events: DomainEventsState,
    pub(crate) dispatch_events_count: u64,
    config: Arc<AggregateConfig>,
}

impl<P> AggregateState<P> {
    pub(crate) fn new(
        type_name: String,
        props: EntityProps<P>,
        config: Arc<AggregateConfig>,
    ) -> Self {
        Self {
            type_name,
            props,
            domain_events: DomainEventsState::default(),
            dispatch_events_count: 0,
            config,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> &UniqueId {
        self.props.id()
    }

    pub fn domain_events(&self) -> &DomainEventsState {
        &self.domain_events
    }

    pub fn dispatch_events_count(&self) -> u64 {
        self.dispatch_events_count
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// `[Aggregate@<type>]:<id>`; ignores every prop except the id
    pub fn hash_code(&self) -> UniqueId {
        UniqueId::Text(format!("[Aggregate@{}]:{}", self.type_name, self.props.id()))
    }
}

/// Overrides applied by [`clone_aggregate`]
pub struct CloneOptions<P> {
    pub id: Option<UniqueId>,
    pub props: Option<P>,
    /// Keep the handler table and emitted history
    pub copy_events: bool,
}

impl<P> Default for CloneOptions<P> {
    fn default() -> Self {
        Self {
            id: None,
            props: None,
            copy_events: false,
        }
    }
}

/// Copy a state, optionally swapping id or props. Events are dropped unless
/// `copy_events` is set.
pub fn clone_aggregate<P: Clone>(
    original: &AggregateState<P>,
    options: CloneOptions<P>,
) -> AggregateState<P> {
    let mut props = original.props.clone();
    if let Some(data) = options.props {
        props.data = data;
    }
    if let Some(id) = options.id {
        props = props.with_identity(id);
    }

    AggregateState {
        type_name: original.type_name.clone(),
        props,
        domain_events: if options.copy_events {
            original.domain_events.clone()
        } else {
            DomainEventsState::default()
        },
        dispatch_events_count: original.dispatch_events_count,
        config: Arc::clone(&original.config),
    }
}
