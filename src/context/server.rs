use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use super::event::{ContextEvent, ContextHandler, EventRecord};
use super::manager::{ContextFlavor, Environment, EventContextManager};
use super::name::{is_wildcard, validate_event_name, validate_literal_event_name, WildcardPattern};
use super::transport::EventTransport;
use crate::error::{DomainError, DomainResult};

/// Context manager backed by an [`EventTransport`]
pub struct ServerEventManager {
    events: RwLock<Vec<EventRecord>>,
    emitter: Arc<dyn EventTransport>,
}

impl ServerEventManager {
    pub fn new(environment: &Environment) -> DomainResult<Self> {
        match environment {
            Environment::Server { emitter } => Ok(Self {
                events: RwLock::new(Vec::new()),
                emitter: Arc::clone(emitter),
            }),
            other => Err(DomainError::EnvironmentMismatch {
                manager: "ServerEventManager",
                expected: ContextFlavor::Server,
                found: other.flavor(),
            }),
        }
    }

    pub fn emitter(&self) -> &Arc<dyn EventTransport> {
        &self.emitter
    }

    fn exists_in(&self, events: &[EventRecord], name: &str) -> bool {
        self.emitter.listener_count(name) > 0 || events.iter().any(|e| e.name == name)
    }
}

#[async_trait]
impl EventContextManager for ServerEventManager {
    fn flavor(&self) -> ContextFlavor {
        ContextFlavor::Server
    }

    fn subscribe(&self, name: &str, handler: ContextHandler) -> DomainResult<()> {
        validate_literal_event_name(name)?;

        let mut events = self.events.write();
        if self.exists_in(&events, name) {
            tracing::debug!(event = %name, "Already subscribed; skipping");
            return Ok(());
        }

        events.push(EventRecord {
            name: name.to_string(),
            callback: Arc::clone(&handler),
        });
        self.emitter.on(name, handler);

        tracing::debug!(event = %name, "Subscribed to context event");
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.exists_in(&self.events.read(), name)
    }

    fn remove(&self, name: &str) -> DomainResult<bool> {
        validate_literal_event_name(name)?;

        let record = {
            let mut events = self.events.write();
            match events.iter().position(|e| e.name == name) {
                Some(index) => events.remove(index),
                None => return Ok(false),
            }
        };

        self.emitter.off(name, &record.callback);
        tracing::debug!(event = %name, "Removed context event");
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
                .filter(|e| pattern.matches(&e.name))
                .map(|e| e.name.clone())
                .collect();

            tracing::debug!(pattern = %name, matched = matched.len(), "Wildcard dispatch");

            for target in matched {
                let event = ContextEvent::new(target.as_str(), args.clone());
                self.emitter.emit(&target, event).await;
            }
        }

        self.emitter.emit(name, ContextEvent::new(name, args)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::browser::InMemoryBrowserHost;
    use crate::context::event::context_handler;
    use crate::context::transport::InProcessEmitter;
    use parking_lot::Mutex;
    use serde_json::json;

    fn manager() -> ServerEventManager {
        ServerEventManager::new(&Environment::server()).unwrap()
    }

    fn recording_handler(log: Arc<Mutex<Vec<ContextEvent>>>) -> ContextHandler {
        context_handler(move |event| {
            let log = log.clone();
            async move {
                log.lock().push(event);
                Ok(())
            }
        })
    }

    #[test]
    fn test_rejects_browser_environment() {
        let environment = Environment::Browser {
            host: Arc::new(InMemoryBrowserHost::new()),
        };
        let result = ServerEventManager::new(&environment);
        assert!(matches!(
            result,
            Err(DomainError::EnvironmentMismatch {
                expected: ContextFlavor::Server,
                found: ContextFlavor::Browser,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let manager = manager();
        let log = Arc::new(Mutex::new(Vec::new()));

        manager.subscribe("user:created", recording_handler(log.clone())).unwrap();
        assert!(manager.exists("user:created"));
        manager.subscribe("user:created", recording_handler(log.clone())).unwrap();
        assert!(manager.exists("user:created"));
        assert_eq!(manager.emitter().listener_count("user:created"), 1);

        manager.dispatch("user:created", vec![json!("john")]).await.unwrap();
        assert_eq!(log.lock().len(), 1);
        assert_eq!(log.lock()[0].detail, vec![json!("john")]);
    }

    #[tokio::test]
    async fn test_exists_sees_listeners_attached_directly() {
        let emitter: Arc<dyn EventTransport> = Arc::new(InProcessEmitter::new());
        let manager = ServerEventManager::new(&Environment::Server {
            emitter: emitter.clone(),
        })
        .unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        emitter.on("external", recording_handler(log.clone()));
        assert!(manager.exists("external"));

        // The external listener blocks a duplicate subscription
        manager.subscribe("external", recording_handler(log.clone())).unwrap();
        assert_eq!(emitter.listener_count("external"), 1);
        assert!(!manager.remove("external").unwrap());
    }

    #[tokio::test]
    async fn test_remove_detaches_handler() {
        let manager = manager();
        let log = Arc::new(Mutex::new(Vec::new()));

        manager.subscribe("order:paid", recording_handler(log.clone())).unwrap();
        assert!(manager.remove("order:paid").unwrap());
        assert!(!manager.exists("order:paid"));
        assert!(!manager.remove("order:paid").unwrap());

        manager.dispatch("order:paid", vec![]).await.unwrap();
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_wildcard_dispatch_fires_matches_and_literal() {
        let manager = manager();
        let log = Arc::new(Mutex::new(Vec::new()));

        manager.subscribe("user:created", recording_handler(log.clone())).unwrap();
        manager.subscribe("user:deleted", recording_handler(log.clone())).unwrap();
        manager.subscribe("order:created", recording_handler(log.clone())).unwrap();

        let base = Arc::new(Mutex::new(Vec::new()));
        manager.emitter().on("user:*", recording_handler(base.clone()));

        manager.dispatch("user:*", vec![json!(1)]).await.unwrap();

        let mut names: Vec<String> = log.lock().iter().map(|e| e.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["user:created", "user:deleted"]);

        let base = base.lock();
        assert_eq!(base.len(), 1);
        assert_eq!(base[0].name, "user:*");
        assert_eq!(base[0].detail, vec![json!(1)]);
    }

    #[tokio::test]
    async fn test_invalid_names_fail_fast() {
        let manager = manager();
        let log = Arc::new(Mutex::new(Vec::new()));

        assert!(matches!(
            manager.subscribe("", recording_handler(log.clone())),
            Err(DomainError::EmptyEventName)
        ));
        assert!(matches!(
            manager.subscribe("user:*", recording_handler(log)),
            Err(DomainError::WildcardNotAllowed(_))
        ));
        assert!(manager.dispatch("", vec![]).await.is_err());
        assert!(manager.remove("").is_err());
    }
}
