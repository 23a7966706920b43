use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::browser::{BrowserEventManager, BrowserHost};
use super::event::ContextHandler;
use super::server::ServerEventManager;
use super::transport::{EventTransport, InProcessEmitter};
use crate::error::DomainResult;

// ============================================================================
// Event Context Manager
// ============================================================================
//
// One place to subscribe to, dispatch and remove named events across an
// application. The backing strategy is chosen once, from an explicitly
// injected `Environment`, and shared by every aggregate in the process.
//
// ============================================================================

#[async_trait]
pub trait EventContextManager: Send + Sync {
    fn flavor(&self) -> ContextFlavor;

    /// Register `handler` under `name`; a second subscription to the same name
    /// is a no-op.
    fn subscribe(&self, name: &str, handler: ContextHandler) -> DomainResult<()>;

    /// True when the backing transport or the local registry knows `name`
    fn exists(&self, name: &str) -> bool;

    /// Drop the local record and detach from the transport
    fn remove(&self, name: &str) -> DomainResult<bool>;

    /// Fire `name`. Wildcard names additionally fire every registered name
    /// they match, before the literal name itself.
    async fn dispatch(&self, name: &str, args: Vec<Value>) -> DomainResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFlavor {
    Server,
    Browser,
}

impl fmt::Display for ContextFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextFlavor::Server => f.write_str("server"),
            ContextFlavor::Browser => f.write_str("browser"),
        }
    }
}

/// Runtime the context is built for, with the transport it should wrap
#[derive(Clone)]
pub enum Environment {
    Server { emitter: Arc<dyn EventTransport> },
    Browser { host: Arc<dyn BrowserHost> },
}

impl Environment {
    /// Server environment over a fresh in-process emitter
    pub fn server() -> Self {
        Environment::Server {
            emitter: InProcessEmitter::shared(),
        }
    }

    pub fn flavor(&self) -> ContextFlavor {
        match self {
            Environment::Server { .. } => ContextFlavor::Server,
            Environment::Browser { .. } => ContextFlavor::Browser,
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Environment").field(&self.flavor()).finish()
    }
}

static EVENT_CONTEXT: OnceCell<Arc<dyn EventContextManager>> = OnceCell::new();

/// Process-wide context, built on first call.
///
/// Later calls return the same instance whatever environment they pass.
pub fn create_event_context(
    environment: &Environment,
) -> DomainResult<Arc<dyn EventContextManager>> {
    let context = EVENT_CONTEXT.get_or_try_init(|| build_event_context(environment))?;

    if context.flavor() != environment.flavor() {
        tracing::debug!(
            active = %context.flavor(),
            requested = %environment.flavor(),
            "Event context already initialized; requested environment ignored"
        );
    }

    Ok(Arc::clone(context))
}

/// Build a standalone context for `environment`, bypassing the process-wide
/// instance.
pub fn build_event_context(
    environment: &Environment,
) -> DomainResult<Arc<dyn EventContextManager>> {
    let manager: Arc<dyn EventContextManager> = match environment {
        Environment::Server { .. } => Arc::new(ServerEventManager::new(environment)?),
        Environment::Browser { .. } => Arc::new(BrowserEventManager::new(environment)?),
    };

    tracing::info!(flavor = %manager.flavor(), "Event context created");
    Ok(manager)
}
