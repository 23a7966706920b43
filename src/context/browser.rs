use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::event::{context_handler, ContextEvent, ContextHandler, EventRecord};
use super::manager::{ContextFlavor, Environment, EventContextManager};
use super::name::{is_wildcard, validate_event_name, validate_literal_event_name, WildcardPattern};
use crate::error::{DomainError, DomainResult};
use crate::utils::start_isolated;

// ============================================================================
// Browser Flavor
// ============================================================================
//
// Wraps a host with a native broadcast bus (add/remove/dispatch of custom
// events) and a session-scoped key/value store. Session keys mark live
// subscriptions so a reloaded page does not subscribe twice; every
// subscription also hooks the host's `beforeunload` event to clear its key.
//
// ============================================================================

const SESSION_KEY_PREFIX: &str = "ddd";

/// Host lifecycle event fired before the page goes away
pub const BEFORE_UNLOAD: &str = "beforeunload";

pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
    fn remove_item(&self, key: &str);
}

/// Event dispatched through the host bus
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    pub event_type: String,
    pub bubbles: bool,
    pub detail: Vec<Value>,
}

impl CustomEvent {
    pub fn new(event_type: impl Into<String>, detail: Vec<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: true,
            detail,
        }
    }
}

impl From<CustomEvent> for ContextEvent {
    fn from(event: CustomEvent) -> Self {
        ContextEvent::new(event.event_type, event.detail)
    }
}

#[async_trait]
pub trait BrowserHost: Send + Sync {
    fn add_event_listener(&self, event_type: &str, listener: ContextHandler);
    fn remove_event_listener(&self, event_type: &str, listener: &ContextHandler);
    async fn dispatch_event(&self, event: CustomEvent);
    fn session_storage(&self) -> &dyn SessionStorage;
}

fn session_key(name: &str) -> String {
    format!("{}:{}", SESSION_KEY_PREFIX, name)
}

struct BrowserRecord {
    record: EventRecord,
    unload_hook: ContextHandler,
}

/// Context manager backed by a [`BrowserHost`]
pub struct BrowserEventManager {
    events: RwLock<Vec<BrowserRecord>>,
    host: Arc<dyn BrowserHost>,
}

impl BrowserEventManager {
    pub fn new(environment: &Environment) -> DomainResult<Self> {
        match environment {
            Environment::Browser { host } => Ok(Self {
                events: RwLock::new(Vec::new()),
                host: Arc::clone(host),
            }),
            other => Err(DomainError::EnvironmentMismatch {
                manager: "BrowserEventManager",
                expected: ContextFlavor::Browser,
                found: other.flavor(),
            }),
        }
    }

    fn exists_in(&self, events: &[BrowserRecord], name: &str) -> bool {
        let in_session = self.host.session_storage().get_item(&session_key(name)).is_some();
        in_session || events.iter().any(|e| e.record.name == name)
    }

    fn unload_hook(&self, name: &str) -> ContextHandler {
        let key = session_key(name);
        let host = Arc::downgrade(&self.host);
        context_handler(move |_event| {
            let key = key.clone();
            let host = host.clone();
            async move {
                if let Some(host) = host.upgrade() {
                    host.session_storage().remove_item(&key);
                }
                Ok(())
            }
        })
    }
}

#[async_trait]
impl EventContextManager for BrowserEventManager {
    fn flavor(&self) -> ContextFlavor {
        ContextFlavor::Browser
    }

    fn subscribe(&self, name: &str, handler: ContextHandler) -> DomainResult<()> {
        validate_literal_event_name(name)?;

        let mut events = self.events.write();
        if self.exists_in(&events, name) {
            tracing::debug!(event = %name, "Already subscribed in this session; skipping");
            return Ok(());
        }

        let unload_hook = self.unload_hook(name);
        events.push(BrowserRecord {
            record: EventRecord {
                name: name.to_string(),
                callback: Arc::clone(&handler),
            },
            unload_hook: Arc::clone(&unload_hook),
        });

        self.host
            .session_storage()
            .set_item(&session_key(name), Utc::now().timestamp_millis().to_string());
        self.host.add_event_listener(name, handler);
        self.host.add_event_listener(BEFORE_UNLOAD, unload_hook);

        tracing::debug!(event = %name, "Subscribed to browser event");
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.exists_in(&self.events.read(), name)
    }

    fn remove(&self, name: &str) -> DomainResult<bool> {
        validate_literal_event_name(name)?;

        let removed = {
            let mut events = self.events.write();
            match events.iter().position(|e| e.record.name == name) {
                Some(index) => events.remove(index),
                None => return Ok(false),
            }
        };

        self.host.session_storage().remove_item(&session_key(name));
        self.host.remove_event_listener(name, &removed.record.callback);
        self.host.remove_event_listener(BEFORE_UNLOAD, &removed.unload_hook);
        Ok(true)
    }

    async fn dispatch(&self, name: &str, args: Vec<Value>) -> DomainResult<()> {
        validate_event_name(name)?;

        if is_wildcard(name) {
            let pattern = WildcardPattern::compile(name)?;
            let matched: Vec<String> = self
                .events
                .read()
                .iter()
                .filter(|e| pattern.matches(&e.record.name))
                .map(|e| e.record.name.clone())
                .collect();

            for target in matched {
                self.host.dispatch_event(CustomEvent::new(target, args.clone())).await;
            }
        }

        self.host.dispatch_event(CustomEvent::new(name, args)).await;
        Ok(())
    }
}

// ============================================================================
// In-Memory Host
// ============================================================================

/// Session store kept in memory; share one between hosts to model a reload
#[derive(Default)]
pub struct MemorySessionStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        self.items.write().insert(key.to_string(), value);
    }

    fn remove_item(&self, key: &str) {
        self.items.write().remove(key);
    }
}

/// Host emulation for runtimes without a native browser bus
#[derive(Default)]
pub struct InMemoryBrowserHost {
    listeners: RwLock<HashMap<String, Vec<ContextHandler>>>,
    storage: Arc<MemorySessionStorage>,
}

impl InMemoryBrowserHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(storage: Arc<MemorySessionStorage>) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            storage,
        }
    }

    pub fn storage(&self) -> &Arc<MemorySessionStorage> {
        &self.storage
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.read().get(event_type).map_or(0, Vec::len)
    }

    /// Fire `beforeunload`, then drop every listener
    pub async fn unload(&self) {
        self.dispatch_event(CustomEvent::new(BEFORE_UNLOAD, Vec::new())).await;
        self.listeners.write().clear();
        tracing::debug!("Browser host unloaded");
    }
}

#[async_trait]
impl BrowserHost for InMemoryBrowserHost {
    fn add_event_listener(&self, event_type: &str, listener: ContextHandler) {
        self.listeners
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push(listener);
    }

    fn remove_event_listener(&self, event_type: &str, listener: &ContextHandler) {
        let mut listeners = self.listeners.write();
        if let Some(attached) = listeners.get_mut(event_type) {
            attached.retain(|candidate| !Arc::ptr_eq(candidate, listener));
            if attached.is_empty() {
                listeners.remove(event_type);
            }
        }
    }

    async fn dispatch_event(&self, event: CustomEvent) {
        let listeners = self
            .listeners
            .read()
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        let event_type = event.event_type.clone();
        let payload = ContextEvent::from(event);
        let runs = listeners.into_iter().map(|listener| {
            let payload = payload.clone();
            start_isolated(move || listener(payload))
        });

        for outcome in join_all(runs).await {
            if let Err(failure) = outcome {
                tracing::warn!(event = %event_type, error = %failure, "Browser listener failed");
            }
        }
    }

    fn session_storage(&self) -> &dyn SessionStorage {
        &*self.storage
    }
}
