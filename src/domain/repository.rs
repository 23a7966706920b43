use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entity::UniqueId;

// ============================================================================
// Repository Port - persistence boundary for aggregates
// ============================================================================
//
// Narrow interface only. Storage adapters live outside this crate and
// implement `Repository<E>` for their own entity type.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort key for paginated queries. `field: None` means storage order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: Option<String>,
    pub param: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedQueryParams {
    pub limit: usize,
    pub page: usize,
    pub offset: usize,
    pub order_by: OrderBy,
}

impl PaginatedQueryParams {
    /// Params for a 1-based `page` of `limit` rows, offset derived
    pub fn page(page: usize, limit: usize) -> Self {
        Self {
            limit,
            page,
            offset: page.saturating_sub(1).saturating_mul(limit),
            order_by: OrderBy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: usize,
    pub limit: usize,
    pub page: usize,
    pub data: Vec<T>,
}

pub fn create_paginated<T>(
    count: usize,
    params: &PaginatedQueryParams,
    data: Vec<T>,
) -> Paginated<T> {
    Paginated {
        count,
        limit: params.limit,
        page: params.page,
        data,
    }
}

#[async_trait]
pub trait Repository<E>: Send + Sync
where
    E: Send + Sync + 'static,
{
    async fn find_by_id(&self, id: &UniqueId) -> Result<Option<E>>;
    async fn find_all(&self) -> Result<Vec<E>>;
    async fn find_all_by_ids(&self, ids: &[UniqueId]) -> Result<Vec<E>>;
    async fn find_all_paginated(&self, params: &PaginatedQueryParams) -> Result<Paginated<E>>;
    async fn exists_by_id(&self, id: &UniqueId) -> Result<bool>;
    async fn count(&self) -> Result<usize>;

    async fn insert(&self, entity: E) -> Result<E>;
    async fn insert_many(&self, entities: Vec<E>) -> Result<()>;
    async fn update(&self, entity: E) -> Result<E>;

    async fn delete_by_id(&self, id: &UniqueId) -> Result<bool>;
    async fn delete_all_by_ids(&self, ids: &[UniqueId]) -> Result<bool>;
}
