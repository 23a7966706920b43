use std::fmt;
use std::sync::Arc;

use crate::context::{EventContextManager, EventTransport, InProcessEmitter};
use crate::metrics::EventMetrics;

// ============================================================================
// Aggregate Configuration
// ============================================================================
//
// Captured once when an aggregate is created and carried in its state.
// Defaults come from the environment (DOMAIN_KIT_DEBUG / DEBUG,
// DOMAIN_KIT_RESET_METRICS); everything else is injected explicitly.
//
// ============================================================================

pub const DEBUG_ENV: &str = "DOMAIN_KIT_DEBUG";
pub const FALLBACK_DEBUG_ENV: &str = "DEBUG";
pub const RESET_METRICS_ENV: &str = "DOMAIN_KIT_RESET_METRICS";

#[derive(Clone)]
pub struct AggregateConfig {
    /// Log handler failures from `dispatch_event`
    pub debug: bool,
    /// `clear_events` also zeroes the dispatch counter
    pub reset_metrics: bool,
    /// Transport backing the server-flavored event context
    pub emitter: Arc<dyn EventTransport>,
    /// Explicit context; the process-wide one is used when absent
    pub context: Option<Arc<dyn EventContextManager>>,
    pub metrics: Option<Arc<EventMetrics>>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            debug: env_flag(DEBUG_ENV)
                .or_else(|| env_flag(FALLBACK_DEBUG_ENV))
                .unwrap_or(false),
            reset_metrics: false,
            emitter: InProcessEmitter::shared(),
            context: None,
            metrics: None,
        }
    }
}

impl AggregateConfig {
    /// Defaults plus `DOMAIN_KIT_RESET_METRICS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(reset) = env_flag(RESET_METRICS_ENV) {
            config.reset_metrics = reset;
        }
        config
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_reset_metrics(mut self, reset_metrics: bool) -> Self {
        self.reset_metrics = reset_metrics;
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn EventTransport>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn with_context(mut self, context: Arc<dyn EventContextManager>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<EventMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl fmt::Debug for AggregateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateConfig")
            .field("debug", &self.debug)
            .field("reset_metrics", &self.reset_metrics)
            .field("context", &self.context.as_ref().map(|c| c.flavor()))
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
