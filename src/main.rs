use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use domain_kit::context::context_handler;
use domain_kit::{
    aggregate_event_handler, create_event_context, domain_event_handler, Aggregate,
    AggregateConfig, DomainEventOptions, Environment, EventMetrics,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG (e.g. RUST_LOG=debug)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,domain_kit=debug")),
        )
        .init();

    tracing::info!("🚀 Starting domain_kit demo");

    // === 1. Metrics + shared event context ===
    let metrics = Arc::new(EventMetrics::new()?);
    let config = AggregateConfig::from_env().with_metrics(metrics.clone());
    let context = create_event_context(&Environment::Server {
        emitter: config.emitter.clone(),
    })?;
    let config = config.with_context(context.clone());

    // Anyone can listen on the shared context
    context.subscribe(
        "user:created",
        context_handler(|event| async move {
            tracing::info!(
                event = %event.name,
                detail = ?event.detail,
                "📡 Context listener fired"
            );
            Ok(())
        }),
    )?;
    context.subscribe(
        "user:updated",
        context_handler(|event| async move {
            tracing::info!(event = %event.name, "📡 Context listener fired");
            Ok(())
        }),
    )?;

    // === 2. Aggregate lifecycle ===
    let user = Arc::new(Aggregate::create(
        "User",
        User {
            name: "John".to_string(),
            age: 20,
        },
        config,
    )?);
    tracing::info!(id = %user.id(), hash = %user.hash_code(), "✅ User created");

    let ctx = user.get_context();
    user.update(|mut state, events| async move {
        let handler = aggregate_event_handler(move |args| {
            let ctx = ctx.clone();
            async move {
                ctx.dispatch("user:updated", args).await?;
                Ok(())
            }
        });
        state = events.add_event(state, "user:birthday", handler, None)?;

        state.props.age += 1;
        state.props.touch();
        let state = events
            .dispatch_event(state, "user:birthday", vec![json!({ "age": 21 })])
            .await?;
        Ok(events.clear_events(state))
    })
    .await?;

    let state = user.get_state();
    tracing::info!(
        age = state.props.age,
        dispatched = state.dispatch_events_count(),
        "✅ User updated"
    );

    // === 3. Registry bound to the aggregate ===
    let registry = user.event_registry();
    registry.add(
        "user:created",
        domain_event_handler(|user: Arc<Aggregate<User>>, invocation| async move {
            let object = user.to_object()?;
            user.get_context().dispatch(&invocation.name, vec![object]).await?;
            Ok(())
        }),
        Some(DomainEventOptions::with_priority(1)),
    )?;
    let outcome = registry.dispatch_events().await;
    tracing::info!(invoked = outcome.invoked, failed = outcome.failed, "✅ Registry flushed");

    // === 4. Wildcard dispatch over the context ===
    context.dispatch("user:*", vec![json!("broadcast")]).await?;

    tracing::info!(
        "📊 Metrics registry holds {} metric families",
        metrics.registry().gather().len()
    );
    tracing::info!("🎉 Demo complete!");

    Ok(())
}
