use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;

// ============================================================================
// Handler Isolation
// ============================================================================
//
// Every dispatch path (emitter, browser host, registry, aggregate) runs
// handlers through here so that an error or a panic in one handler is turned
// into a value instead of unwinding into its siblings or the caller.
//
// ============================================================================

/// Future returned by every event handler in this crate
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Why a handler did not complete successfully
#[derive(Debug, thiserror::Error)]
pub enum HandlerFailure {
    #[error("handler returned an error: {0}")]
    Failed(#[source] anyhow::Error),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Start a handler and return a future that resolves to its isolated outcome.
///
/// `start` runs synchronously, so callers that start several handlers in a
/// loop get a deterministic invocation order even though completion order
/// is left to the executor.
pub fn start_isolated<F>(start: F) -> BoxFuture<'static, Result<(), HandlerFailure>>
where
    F: FnOnce() -> HandlerFuture,
{
    match std::panic::catch_unwind(AssertUnwindSafe(start)) {
        Ok(running) => AssertUnwindSafe(running)
            .catch_unwind()
            .map(|outcome| match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(error)) => Err(HandlerFailure::Failed(error)),
                Err(payload) => Err(HandlerFailure::Panicked(panic_message(payload))),
            })
            .boxed(),
        Err(payload) => {
            future::ready(Err(HandlerFailure::Panicked(panic_message(payload)))).boxed()
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
