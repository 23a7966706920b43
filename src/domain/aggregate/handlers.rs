use chrono::Utc;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;

use super::state::{
    AggregateEventHandler, AggregateState, DomainEventsState, EmittedEvent, NamedEventHandler,
    RegisteredHandler,
};
use crate::context::{validate_event_name, validate_literal_event_name};
use crate::domain::events::DomainEventOptions;
use crate::error::DomainResult;
use crate::metrics::AGGREGATE_MECHANISM;
use crate::utils::start_isolated;

// ============================================================================
// Aggregate Event Operations
// ============================================================================
//
// Pure transitions over the `domain_events` part of an AggregateState. They
// take the current state by value and hand back the next one.
//
// Unlike the Domain Event Registry, handlers here are additive per name and
// stay registered after a dispatch until `clear_events`.
//
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateEventHandlers;

impl AggregateEventHandlers {
    /// Append `handler` to the handlers of `name`
    pub fn add_event<P>(
        &self,
        mut current: AggregateState<P>,
        name: &str,
        handler: AggregateEventHandler,
        options: Option<DomainEventOptions>,
    ) -> DomainResult<AggregateState<P>> {
        validate_literal_event_name(name)?;

        let events = &mut current.domain_events;
        let options =
            options.unwrap_or_else(|| DomainEventOptions::default_for(events.registrations));
        events.registrations += 1;
        events
            .handlers
            .entry(name.to_string())
            .or_default()
            .push(RegisteredHandler { handler, options });

        Ok(current)
    }

    pub fn add_named_event<P>(
        &self,
        current: AggregateState<P>,
        named: NamedEventHandler,
    ) -> DomainResult<AggregateState<P>> {
        self.add_event(current, &named.name, named.handler, named.options)
    }

    /// Drop every handler for `name`
    pub fn remove_event<P>(
        &self,
        mut current: AggregateState<P>,
        name: &str,
    ) -> DomainResult<AggregateState<P>> {
        validate_event_name(name)?;

        current.domain_events.handlers.remove(name);
        Ok(current)
    }

    /// Run every handler for `name` concurrently, record the dispatch and
    /// bump the counter. Handlers stay registered. Failures are isolated and
    /// only logged when the aggregate was created with `debug`.
    pub async fn dispatch_event<P>(
        &self,
        mut current: AggregateState<P>,
        name: &str,
        args: Vec<Value>,
    ) -> DomainResult<AggregateState<P>> {
        validate_event_name(name)?;

        let mut handlers = current.domain_events.handlers_for(name).to_vec();
        handlers.sort_by_key(|registered| registered.options.priority);

        let runs: Vec<_> = handlers
            .iter()
            .map(|registered| {
                let handler = Arc::clone(&registered.handler);
                let args = args.clone();
                start_isolated(move || handler(args))
            })
            .collect();

        let debug = current.config().debug;
        let metrics = current.config().metrics.clone();

        for outcome in join_all(runs).await {
            if let Err(failure) = outcome {
                if debug {
                    tracing::error!(event = %name, error = %failure, "Error handling event");
                }
                if let Some(metrics) = &metrics {
                    metrics.record_handler_failure(AGGREGATE_MECHANISM);
                }
            }
        }

        if let Some(metrics) = &metrics {
            metrics.record_dispatch(AGGREGATE_MECHANISM, 1);
        }

        current.domain_events.emitted.push(EmittedEvent {
            name: name.to_string(),
            args,
            emitted_at: Utc::now(),
        });
        current.dispatch_events_count += 1;

        Ok(current)
    }

    /// Reset handlers and history; the counter is zeroed only with
    /// `reset_metrics`.
    pub fn clear_events<P>(&self, mut current: AggregateState<P>) -> AggregateState<P> {
        current.domain_events = DomainEventsState::default();
        if current.config().reset_metrics {
            current.dispatch_events_count = 0;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregateConfig;
    use crate::domain::aggregate::state::aggregate_event_handler;
    use crate::domain::entity::EntityProps;
    use crate::error::DomainError;
    use crate::metrics::EventMetrics;
    use crate::utils::testing::ErrorEvents;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OPS: AggregateEventHandlers = AggregateEventHandlers;

    fn state_with(config: AggregateConfig) -> AggregateState<()> {
        AggregateState::new("Counter".to_string(), EntityProps::new(()), Arc::new(config))
    }

    fn state() -> AggregateState<()> {
        state_with(AggregateConfig::default())
    }

    fn counting(counter: Arc<AtomicUsize>) -> AggregateEventHandler {
        aggregate_event_handler(move |_args| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[test]
    fn test_add_event_is_additive_and_pure() {
        let counter = Arc::new(AtomicUsize::new(0));
        let before = state();

        let after = OPS.add_event(before.clone(), "tick", counting(counter.clone()), None).unwrap();
        let after = OPS.add_event(after, "tick", counting(counter), None).unwrap();

        assert_eq!(before.domain_events().handler_count(), 0);
        assert_eq!(after.domain_events().handlers_for("tick").len(), 2);
    }

    #[test]
    fn test_add_event_rejects_invalid_names() {
        let counter = Arc::new(AtomicUsize::new(0));
        assert!(matches!(
            OPS.add_event(state(), "", counting(counter.clone()), None),
            Err(DomainError::EmptyEventName)
        ));
        assert!(matches!(
            OPS.add_event(state(), "tick:*", counting(counter), None),
            Err(DomainError::WildcardNotAllowed(_))
        ));
    }

    #[test]
    fn test_remove_event_rejects_invalid_names() {
        let counter = Arc::new(AtomicUsize::new(0));
        let current = OPS.add_event(state(), "tick", counting(counter), None).unwrap();

        assert!(matches!(
            OPS.remove_event(current.clone(), ""),
            Err(DomainError::EmptyEventName)
        ));
        assert!(matches!(
            OPS.remove_event(current, "   "),
            Err(DomainError::InvalidEventName(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_keeps_handlers_and_records_history() {
        let counter = Arc::new(AtomicUsize::new(0));
        let current = OPS.add_event(state(), "tick", counting(counter.clone()), None).unwrap();

        let current = OPS.dispatch_event(current, "tick", vec![json!(1)]).await.unwrap();
        let current = OPS.dispatch_event(current, "tick", vec![json!(2)]).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(current.dispatch_events_count(), 2);
        assert_eq!(current.domain_events().handlers_for("tick").len(), 1);

        let emitted = current.domain_events().emitted();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].args, vec![json!(1)]);
        assert_eq!(emitted[1].name, "tick");
    }

    #[tokio::test]
    async fn test_dispatch_without_handlers_still_counts() {
        let current = OPS.dispatch_event(state(), "nobody", vec![]).await.unwrap();
        assert_eq!(current.dispatch_events_count(), 1);
        assert_eq!(current.domain_events().emitted().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_isolates_failures() {
        let counter = Arc::new(AtomicUsize::new(0));
        let metrics = Arc::new(EventMetrics::new().unwrap());
        let current = state_with(
            AggregateConfig::default()
                .with_debug(true)
                .with_metrics(metrics.clone()),
        );

        let current = OPS
            .add_event(
                current,
                "tick",
                aggregate_event_handler(|_args| async { Err(anyhow::anyhow!("bad handler")) }),
                None,
            )
            .unwrap();
        let current = OPS.add_event(current, "tick", counting(counter.clone()), None).unwrap();

        let current = OPS.dispatch_event(current, "tick", vec![]).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(current.dispatch_events_count(), 1);
        assert_eq!(
            metrics.handler_failures.with_label_values(&[AGGREGATE_MECHANISM]).get(),
            1
        );
    }

    async fn failing_dispatch_errors_logged(debug: bool) -> usize {
        let errors = ErrorEvents::default();
        let _guard = tracing::subscriber::set_default(errors.subscriber());

        let current = OPS
            .add_event(
                state_with(AggregateConfig::default().with_debug(debug)),
                "tick",
                aggregate_event_handler(|_args| async { Err(anyhow::anyhow!("bad handler")) }),
                None,
            )
            .unwrap();
        let current = OPS.dispatch_event(current, "tick", vec![]).await.unwrap();
        assert_eq!(current.dispatch_events_count(), 1);

        errors.count()
    }

    #[tokio::test]
    async fn test_failures_are_silent_without_debug() {
        assert_eq!(failing_dispatch_errors_logged(false).await, 0);
    }

    #[tokio::test]
    async fn test_failures_are_logged_with_debug() {
        assert_eq!(failing_dispatch_errors_logged(true).await, 1);
    }

    #[tokio::test]
    async fn test_handlers_receive_args_in_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = |label: &'static str| {
            let log = log.clone();
            aggregate_event_handler(move |args| {
                let log = log.clone();
                async move {
                    log.lock().push((label, args));
                    Ok(())
                }
            })
        };

        let current = OPS
            .add_event(
                state(),
                "tick",
                recorder("late"),
                Some(DomainEventOptions::with_priority(9)),
            )
            .unwrap();
        let current = OPS
            .add_named_event(
                current,
                NamedEventHandler::new("tick", recorder("early"))
                    .with_options(DomainEventOptions::with_priority(1)),
            )
            .unwrap();

        OPS.dispatch_event(current, "tick", vec![json!("x")]).await.unwrap();

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], ("early", vec![json!("x")]));
        assert_eq!(log[1].0, "late");
    }

    #[tokio::test]
    async fn test_remove_event() {
        let counter = Arc::new(AtomicUsize::new(0));
        let current = OPS.add_event(state(), "tick", counting(counter.clone()), None).unwrap();
        let current = OPS.remove_event(current, "tick").unwrap();
        assert_eq!(current.domain_events().handlers().len(), 0);

        OPS.dispatch_event(current, "tick", vec![]).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_events_preserves_counter_by_default() {
        let counter = Arc::new(AtomicUsize::new(0));
        let current = OPS.add_event(state(), "tick", counting(counter), None).unwrap();
        let current = OPS.dispatch_event(current, "tick", vec![]).await.unwrap();

        let cleared = OPS.clear_events(current);
        assert_eq!(cleared.domain_events().handler_count(), 0);
        assert!(cleared.domain_events().emitted().is_empty());
        assert_eq!(cleared.dispatch_events_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_events_resets_counter_when_configured() {
        let counter = Arc::new(AtomicUsize::new(0));
        let current = state_with(AggregateConfig::default().with_reset_metrics(true));
        let current = OPS.add_event(current, "tick", counting(counter), None).unwrap();
        let current = OPS.dispatch_event(current, "tick", vec![]).await.unwrap();

        let cleared = OPS.clear_events(current);
        assert_eq!(cleared.dispatch_events_count(), 0);
        assert_eq!(cleared.domain_events().handler_count(), 0);
    }
}
