//! Driven port for entity validation.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::FieldError;
#[cfg(test)]
use crate::domain::User;

define_port_error! {
    /// Failures of the validator itself, as opposed to invalid input.
    pub enum ValidatorError {
        /// A rule could not be evaluated.
        Rule { field: String, message: String } => "rule for {field} could not run: {message}",
    }
}

/// Checks an entity and reports every rule it breaks.
#[cfg_attr(test, mockall::automock(type Entity = User;))]
#[async_trait]
pub trait Validator: Send + Sync {
    /// Entity type checked by this validator.
    type Entity: Send + Sync;

    /// Return the broken rules; an empty list means the entity is valid.
    async fn validate(&self, entity: &Self::Entity) -> Result<Vec<FieldError>, ValidatorError>;
}
