pub mod isolate;
#[cfg(test)]
pub(crate) mod testing;

pub use isolate::{start_isolated, HandlerFailure, HandlerFuture};
