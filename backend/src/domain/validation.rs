//! Validation pipeline run before every mutation.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::ports::{Validator, ValidatorError};
use crate::domain::{Error, PatchMap};

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Wire name of the offending field.
    pub field: String,
    /// Machine-readable rule identifier, e.g. `required` or `max_length`.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
}

impl FieldError {
    /// Build a field error.
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Which fields the caller is accountable for.
#[derive(Debug, Clone, Copy)]
pub enum ValidationScope<'a> {
    /// Every field; used for create and update.
    Full,
    /// Only the supplied fields; used for patch.
    Partial(&'a PatchMap),
}

/// Why an entity did not pass validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    /// At least one rule was broken.
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),
    /// The validator could not run.
    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

impl ValidationFailure {
    /// Convert into the API error envelope. Validator faults surface as
    /// internal errors.
    pub fn into_error(self) -> Error {
        match self {
            Self::Invalid(errors) => Error::invalid_request("validation failed")
                .with_details(json!({ "code": "validation_failed", "errors": errors })),
            Self::Validator(_) => Error::internal("Internal server error"),
        }
    }
}

/// Run `validator` against `entity`, keeping only errors inside `scope`.
///
/// # Errors
/// Returns [`ValidationFailure::Invalid`] when any in-scope rule is broken
/// and [`ValidationFailure::Validator`] when the validator fails.
pub async fn run<T, V>(
    validator: &V,
    entity: &T,
    scope: ValidationScope<'_>,
) -> Result<(), ValidationFailure>
where
    T: Send + Sync,
    V: Validator<Entity = T> + ?Sized,
{
    let mut errors = validator.validate(entity).await?;
    if let ValidationScope::Partial(fields) = scope {
        errors.retain(|error| fields.contains(&error.field));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure::Invalid(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockValidator;
    use crate::domain::{ActionLabels, AttributeMetadata, User, build_patch};
    use rstest::rstest;

    fn failing_validator() -> MockValidator {
        let mut validator = MockValidator::new();
        validator.expect_validate().returning(|_| {
            Ok(vec![
                FieldError::new("username", "required", "username is required"),
                FieldError::new("phone", "pattern", "phone has an invalid format"),
            ])
        });
        validator
    }

    #[rstest]
    #[tokio::test]
    async fn full_scope_reports_every_error() {
        let validator = failing_validator();
        let failure = run(&validator, &User::default(), ValidationScope::Full)
            .await
            .expect_err("entity is invalid");
        let ValidationFailure::Invalid(errors) = failure else {
            panic!("expected invalid entity");
        };
        assert_eq!(errors.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn partial_scope_ignores_absent_fields() {
        let metadata =
            AttributeMetadata::resolve::<User>(ActionLabels::default()).expect("user schema");
        let keys = metadata.bind_keys(&["u1"]).expect("key binds");
        let patch = build_patch::<User>(br#"{"phone":"+44 1234"}"#, &metadata, &keys)
            .expect("patch decodes");
        let validator = failing_validator();

        let failure = run(&validator, &patch.entity, ValidationScope::Partial(&patch.fields))
            .await
            .expect_err("phone is invalid");

        assert_eq!(
            failure,
            ValidationFailure::Invalid(vec![FieldError::new(
                "phone",
                "pattern",
                "phone has an invalid format"
            )])
        );
    }

    #[rstest]
    #[tokio::test]
    async fn validator_faults_become_internal_errors() {
        let mut validator = MockValidator::new();
        validator
            .expect_validate()
            .returning(|_| Err(ValidatorError::rule("email", "pattern unavailable")));

        let failure = run(&validator, &User::default(), ValidationScope::Full)
            .await
            .expect_err("validator fails");
        let error = failure.into_error();
        assert_eq!(error.code(), crate::domain::ErrorCode::InternalError);
    }

    #[rstest]
    fn invalid_entities_map_to_invalid_request() {
        let error = ValidationFailure::Invalid(vec![FieldError::new("id", "required", "id is required")])
            .into_error();
        assert_eq!(error.code(), crate::domain::ErrorCode::InvalidRequest);
        let details = error.details().expect("details present");
        assert_eq!(details["errors"][0]["field"], "id");
    }
}
