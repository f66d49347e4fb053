//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay framework-agnostic and do not derive `ToSchema`. The
//! wrappers here mirror their wire shape and register it under the domain
//! type's name.

use utoipa::{IntoParams, ToSchema};

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed, cannot be decoded, or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The request collides with an existing key or unique index.
    #[schema(rename = "conflict")]
    Conflict,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "validation failed")]
    message: String,
    /// Correlation identifier, also sent as the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Supplementary details such as field errors.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::FieldError`].
#[derive(ToSchema)]
#[schema(as = crate::domain::FieldError)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct FieldErrorSchema {
    /// Offending field.
    #[schema(example = "phone")]
    field: String,
    /// Broken rule.
    #[schema(example = "pattern")]
    code: String,
    /// Explanation.
    #[schema(example = "phone has an invalid format")]
    message: String,
}

/// OpenAPI schema for [`crate::domain::User`].
#[derive(ToSchema)]
#[schema(as = crate::domain::User, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct UserSchema {
    /// Primary key.
    #[schema(example = "u1", max_length = 40)]
    id: String,
    /// Unique login name.
    #[schema(example = "ada.lovelace", max_length = 100, pattern = r"^[A-Za-z0-9._-]+$")]
    username: String,
    /// Contact address.
    #[schema(example = "ada@example.org", max_length = 100)]
    email: Option<String>,
    /// Contact number.
    #[schema(example = "+44 20 7946 0018", max_length = 18)]
    phone: String,
    /// Date of birth.
    #[schema(value_type = Option<String>, format = DateTime, example = "1815-12-10T00:00:00Z")]
    date_of_birth: Option<String>,
}

/// OpenAPI schema for a page of users (`pagination::SearchResult<User>`).
#[derive(ToSchema)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct UserSearchResultSchema {
    /// Users on the requested page.
    list: Vec<UserSchema>,
    /// Matches across all pages.
    #[schema(example = 42)]
    total: u64,
}

/// Query parameters accepted by `GET /api/v1/users/search`.
#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI parameter generation via utoipa"
)]
pub struct UserSearchParams {
    /// One-based page number.
    #[param(minimum = 1, example = 1)]
    page: Option<i64>,
    /// Page size; defaults to 20 and is capped at 100 unless configured.
    #[param(minimum = 1, example = 20)]
    limit: Option<i64>,
    /// Sort field, prefixed with `-` for descending order.
    #[param(example = "-username")]
    sort: Option<String>,
    /// Exact id.
    id: Option<String>,
    /// Username prefix.
    username: Option<String>,
    /// Email prefix.
    email: Option<String>,
    /// Exact phone number.
    phone: Option<String>,
    /// Earliest date of birth (inclusive, RFC 3339).
    #[param(rename = "dateOfBirth.min")]
    date_of_birth_min: Option<String>,
    /// Latest date of birth (inclusive, RFC 3339).
    #[param(rename = "dateOfBirth.max")]
    date_of_birth_max: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::PartialSchema;

    fn schema_to_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[test]
    fn error_code_schema_lists_every_code() {
        let schema_json = schema_to_json::<ErrorCodeSchema>();
        for code in ["invalid_request", "not_found", "conflict", "internal_error"] {
            assert!(schema_json.contains(code), "missing {code}");
        }
    }

    #[test]
    fn error_schema_uses_camel_case() {
        let schema_json = schema_to_json::<ErrorSchema>();
        assert!(schema_json.contains("traceId"));
        assert!(!schema_json.contains("trace_id"));
    }

    #[test]
    fn user_schema_matches_wire_names() {
        let schema_json = schema_to_json::<UserSchema>();
        assert_eq!(UserSchema::name(), "crate.domain.User");
        assert!(schema_json.contains("dateOfBirth"));
        assert!(schema_json.contains("username"));
    }

    #[test]
    fn search_params_use_dotted_range_names() {
        let names: Vec<String> = UserSearchParams::into_params(|| None)
            .into_iter()
            .map(|param| param.name)
            .collect();
        assert!(names.iter().any(|name| name == "dateOfBirth.min"));
        assert!(names.iter().any(|name| name == "sort"));
    }
}
