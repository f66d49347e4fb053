//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod entity_service;
mod validator;

#[cfg(test)]
pub use entity_service::MockEntityService;
pub use entity_service::{EntityService, ServiceError};
#[cfg(test)]
pub use validator::MockValidator;
pub use validator::{Validator, ValidatorError};
