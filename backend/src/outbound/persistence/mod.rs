//! In-process persistence adapters.
//!
//! [`InMemoryDocumentStore`] keeps each entity as an ordered JSON document
//! keyed by its canonical key. Criteria types plug in their predicates
//! through [`DocumentQuery`].

mod document_store;
mod user_query;

pub use document_store::{DocumentQuery, InMemoryDocumentStore};

/// Store serving the user resource.
pub type UserStore = InMemoryDocumentStore<crate::domain::User, crate::domain::UserFilter>;
