use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Layer counting ERROR-level events seen by the subscriber it is attached to
#[derive(Clone, Default)]
pub(crate) struct ErrorEvents {
    seen: Arc<AtomicUsize>,
}

impl ErrorEvents {
    /// Registry subscriber with this layer on top, for `set_default`
    pub(crate) fn subscriber(&self) -> impl Subscriber + Send + Sync {
        tracing_subscriber::registry().with(self.clone())
    }

    pub(crate) fn count(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }
}
