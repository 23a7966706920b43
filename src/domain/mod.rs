// ============================================================================
// Domain Layer - entities, aggregates and their events
// ============================================================================
//
// - entity:     identity and props shared by every aggregate
// - events:     per-aggregate Domain Event Registry
// - aggregate:  immutable state machine with an embedded event table
// - repository: persistence port implemented by storage adapters
//
// ============================================================================

pub mod aggregate;
pub mod entity;
pub mod events;
pub mod repository;

pub use aggregate::{Aggregate, AggregateEventHandlers, AggregateState};
pub use entity::{EntityProps, UniqueId};
pub use events::DomainEvents;
pub use repository::{
    create_paginated, OrderBy, Paginated, PaginatedQueryParams, Repository, SortDirection,
};
