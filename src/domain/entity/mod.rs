// ============================================================================
// Entity Identity & Props
// ============================================================================
//
// Leaf building blocks shared by every aggregate: value-compared identity
// and the props record that carries it.
//
// ============================================================================

pub mod props;
pub mod unique_id;

pub use props::EntityProps;
pub use unique_id::{UniqueId, ENTITY_ID_PREFIX};
