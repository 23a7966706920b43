use crate::context::ContextFlavor;
use crate::domain::entity::UniqueId;

// ============================================================================
// Domain Kit Errors
// ============================================================================
//
// Structural and programmer errors surface immediately to the caller.
// Handler failures never appear here; they are isolated at dispatch time
// (see utils::isolate).
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Event name cannot be empty")]
    EmptyEventName,

    #[error("Invalid event name: {0:?}")]
    InvalidEventName(String),

    #[error("Wildcard token is not allowed in a literal event name: {0}")]
    WildcardNotAllowed(String),

    #[error("{manager} needs a {expected} runtime, found {found}")]
    EnvironmentMismatch {
        manager: &'static str,
        expected: ContextFlavor,
        found: ContextFlavor,
    },

    #[error("Aggregate transition failed: {0}")]
    TransitionFailed(#[source] anyhow::Error),

    #[error("Transition changed aggregate identity from {from} to {to}")]
    IdentityChanged { from: UniqueId, to: UniqueId },

    #[error("Invalid wildcard pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
