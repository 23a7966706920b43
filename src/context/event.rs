use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::utils::HandlerFuture;

/// Payload delivered to context subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEvent {
    pub name: String,
    pub detail: Vec<Value>,
}

impl ContextEvent {
    pub fn new(name: impl Into<String>, detail: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            detail,
        }
    }
}

/// Shared context subscriber. Identity (for `off`) is the `Arc` pointer.
pub type ContextHandler = Arc<dyn Fn(ContextEvent) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a [`ContextHandler`]
pub fn context_handler<F, Fut>(handler: F) -> ContextHandler
where
    F: Fn(ContextEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event| handler(event).boxed())
}

/// A subscription held by a context manager
#[derive(Clone)]
pub struct EventRecord {
    pub name: String,
    pub callback: ContextHandler,
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord").field("name", &self.name).finish_non_exhaustive()
    }
}
