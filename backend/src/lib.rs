//! Users resource service library.
//!
//! The crate serves one entity over HTTP through a generic resource endpoint
//! protocol: key binding, partial updates, signed result codes, search
//! decoding with pagination, and masked logging.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
