//! Domain primitives, ports and the user aggregate.
//!
//! Purpose: define the transport-agnostic pieces of the resource endpoint
//! protocol. Schemas, key binding, patch decoding, search decoding, result
//! codes, log masking and validation live here; HTTP and storage concerns
//! live in the inbound and outbound adapters.
//!
//! Public surface:
//! - Error / ErrorCode: API error envelope and its stable identifiers.
//! - AttributeMetadata: key and index data resolved from an [`Entity`].
//! - SearchParameters / Filter: query-string decoding for search.
//! - User / UserFilter / UserValidator: the served aggregate.

pub mod error;
pub mod masking;
pub mod patch;
pub mod ports;
pub mod result_code;
pub mod schema;
pub mod search;
pub mod trace_id;
pub mod user;
pub mod validation;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::masking::{LogMasker, MaskRule, mask};
pub use self::patch::{Patch, PatchMap, build_patch, read_entity, read_object};
pub use self::result_code::{Outcome, ResultCode};
pub use self::schema::{
    ActionLabels, AttributeMetadata, Entity, FieldDescriptor, FieldKind, FieldRole, KeyValues,
    SchemaError,
};
pub use self::search::{Filter, FilterField, SearchCriteria, SearchParameters, SortOrder};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{DateRange, User, UserFilter, UserValidator};
pub use self::validation::{FieldError, ValidationFailure, ValidationScope};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use users_api::domain::{ApiResult, Error};
///
/// fn lookup() -> ApiResult<()> {
///     Err(Error::not_found("user not found"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
