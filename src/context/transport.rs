use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::event::{ContextEvent, ContextHandler};
use crate::utils::start_isolated;

// ============================================================================
// Event Transport - Backing Bus for the Server Flavor
// ============================================================================
//
// The context manager only needs on/off/emit/listener_count. Anything that
// provides those can back a server-side context, including buses that other
// code attaches to directly.
//
// ============================================================================

#[async_trait]
pub trait EventTransport: Send + Sync {
    fn on(&self, name: &str, handler: ContextHandler);

    /// Detach one handler (matched by `Arc` identity); true when it was attached
    fn off(&self, name: &str, handler: &ContextHandler) -> bool;

    /// Deliver `event` to every listener on `name` and wait for all of them
    async fn emit(&self, name: &str, event: ContextEvent);

    fn listener_count(&self, name: &str) -> usize;
}

/// In-process emitter: listeners run concurrently, failures are logged and
/// never reach the emitting caller.
#[derive(Default)]
pub struct InProcessEmitter {
    listeners: RwLock<HashMap<String, Vec<ContextHandler>>>,
}

impl InProcessEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<dyn EventTransport> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl EventTransport for InProcessEmitter {
    fn on(&self, name: &str, handler: ContextHandler) {
        self.listeners
            .write()
            .entry(name.to_string())
            .or_default()
            .push(handler);
    }

    fn off(&self, name: &str, handler: &ContextHandler) -> bool {
        let mut listeners = self.listeners.write();
        let Some(attached) = listeners.get_mut(name) else {
            return false;
        };

        let before = attached.len();
        attached.retain(|candidate| !Arc::ptr_eq(candidate, handler));
        let removed = attached.len() != before;

        if attached.is_empty() {
            listeners.remove(name);
        }
        removed
    }

    async fn emit(&self, name: &str, event: ContextEvent) {
        // Snapshot so listeners may subscribe/unsubscribe while running
        let listeners = self.listeners.read().get(name).cloned().unwrap_or_default();
        if listeners.is_empty() {
            tracing::debug!(event = %name, "No listeners for emitted event");
            return;
        }

        let runs = listeners.into_iter().map(|listener| {
            let event = event.clone();
            start_isolated(move || listener(event))
        });

        for outcome in join_all(runs).await {
            if let Err(failure) = outcome {
                tracing::warn!(event = %name, error = %failure, "Event listener failed");
            }
        }
    }

    fn listener_count(&self, name: &str) -> usize {
        self.listeners.read().get(name).map_or(0, Vec::len)
    }
}
