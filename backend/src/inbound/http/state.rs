//! Shared HTTP adapter state.
//!
//! Handlers receive a [`ResourceEndpoint`] through `actix_web::web::Data`, so
//! they depend only on domain ports and the read-only protocol metadata.

use std::sync::Arc;

use pagination::PageLimits;

use crate::domain::ports::{EntityService, Validator};
use crate::domain::{
    ActionLabels, AttributeMetadata, Entity, LogMasker, SchemaError, SearchCriteria,
    SearchParameters, User, UserFilter,
};

/// Parameter object bundling the ports one resource needs.
pub struct ResourcePorts<T, F> {
    /// Store behind the resource.
    pub service: Arc<dyn EntityService<Entity = T, Criteria = F>>,
    /// Rules checked before every mutation.
    pub validator: Arc<dyn Validator<Entity = T>>,
}

/// Everything a resource's handlers need, resolved once at startup.
pub struct ResourceEndpoint<T, F> {
    service: Arc<dyn EntityService<Entity = T, Criteria = F>>,
    validator: Arc<dyn Validator<Entity = T>>,
    metadata: Arc<AttributeMetadata>,
    search: Arc<SearchParameters<F>>,
    masker: Arc<LogMasker>,
}

// Derive would require `T: Clone` and `F: Clone`.
impl<T, F> Clone for ResourceEndpoint<T, F> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            validator: Arc::clone(&self.validator),
            metadata: Arc::clone(&self.metadata),
            search: Arc::clone(&self.search),
            masker: Arc::clone(&self.masker),
        }
    }
}

impl<T, F> ResourceEndpoint<T, F>
where
    T: Entity,
    F: SearchCriteria,
{
    /// Resolve metadata and search parameters for `T` and `F`.
    ///
    /// # Errors
    /// Returns [`SchemaError`] when the entity or criteria schema is invalid.
    pub fn resolve(
        ports: ResourcePorts<T, F>,
        actions: ActionLabels,
        limits: PageLimits,
        masker: LogMasker,
    ) -> Result<Self, SchemaError> {
        let metadata = Arc::new(AttributeMetadata::resolve::<T>(actions)?);
        let search = SearchParameters::<F>::resolve(&metadata, limits)?;
        Ok(Self::new(ports, metadata, search, masker))
    }

    /// Assemble an endpoint from already resolved parts.
    pub fn new(
        ports: ResourcePorts<T, F>,
        metadata: Arc<AttributeMetadata>,
        search: SearchParameters<F>,
        masker: LogMasker,
    ) -> Self {
        Self {
            service: ports.service,
            validator: ports.validator,
            metadata,
            search: Arc::new(search),
            masker: Arc::new(masker),
        }
    }

    /// Entity store.
    pub fn service(&self) -> &dyn EntityService<Entity = T, Criteria = F> {
        self.service.as_ref()
    }

    /// Entity validator.
    pub fn validator(&self) -> &dyn Validator<Entity = T> {
        self.validator.as_ref()
    }

    /// Key, index and label metadata.
    pub fn metadata(&self) -> &AttributeMetadata {
        &self.metadata
    }

    /// Search parameter decoder.
    pub fn search(&self) -> &SearchParameters<F> {
        &self.search
    }

    /// Redaction applied to entity snapshots in logs.
    pub fn masker(&self) -> &LogMasker {
        &self.masker
    }
}

/// Endpoint state for `/users`.
pub type UsersEndpoint = ResourceEndpoint<User, UserFilter>;
