//! Driven port for the store behind a resource endpoint.
//!
//! Mutations report a [`ResultCode`] rather than an error when the store
//! cannot apply them for business reasons (missing target, duplicate key).
//! [`ServiceError`] is reserved for infrastructure failures.

use async_trait::async_trait;
use pagination::SearchResult;

use super::define_port_error;
use crate::domain::{Filter, KeyValues, PatchMap, ResultCode};
#[cfg(test)]
use crate::domain::{User, UserFilter};

define_port_error! {
    /// Infrastructure failures surfaced by an entity store.
    pub enum ServiceError {
        /// The store could not be reached.
        Connection { message: String } => "entity store connection failed: {message}",
        /// The store accepted the request but failed to run it.
        Query { message: String } => "entity store query failed: {message}",
    }
}

/// Persistence operations for one entity type.
#[cfg_attr(test, mockall::automock(type Entity = User; type Criteria = UserFilter;))]
#[async_trait]
pub trait EntityService: Send + Sync {
    /// Stored record type.
    type Entity: Send + Sync;
    /// Typed search predicates.
    type Criteria: Send + Sync;

    /// Every stored entity, in key order.
    async fn all(&self) -> Result<Vec<Self::Entity>, ServiceError>;

    /// The entity stored under `keys`, if any.
    async fn load(&self, keys: &KeyValues) -> Result<Option<Self::Entity>, ServiceError>;

    /// Insert a new entity. Negative codes signal a duplicate key or index.
    async fn create(&self, entity: &Self::Entity) -> Result<ResultCode, ServiceError>;

    /// Replace an existing entity. Zero means it does not exist.
    async fn update(&self, entity: &Self::Entity) -> Result<ResultCode, ServiceError>;

    /// Merge the supplied fields into an existing entity. `null` clears a
    /// field.
    async fn patch(&self, fields: &PatchMap) -> Result<ResultCode, ServiceError>;

    /// Remove the entity stored under `keys`.
    async fn delete(&self, keys: &KeyValues) -> Result<ResultCode, ServiceError>;

    /// One page of entities matching `filter`, plus the total match count.
    async fn search(
        &self,
        filter: &Filter<Self::Criteria>,
        limit: u32,
        offset: u64,
    ) -> Result<SearchResult<Self::Entity>, ServiceError>;
}
