//! User data model, search criteria and validation rules.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::ports::{Validator, ValidatorError};
use crate::domain::{Entity, FieldDescriptor, FieldError, FieldKind, FieldRole, FilterField, SearchCriteria};

/// Maximum length of a user id.
pub const ID_MAX: usize = 40;
/// Maximum length of a username.
pub const USERNAME_MAX: usize = 100;
/// Maximum length of an email address.
pub const EMAIL_MAX: usize = 100;
/// Maximum length of a phone number.
pub const PHONE_MAX: usize = 18;

/// A registered user.
///
/// Every field defaults when absent so that partial patch bodies decode;
/// [`UserValidator`] enforces the required ones.
///
/// # Examples
/// ```
/// use users_api::domain::User;
///
/// let user: User = serde_json::from_str(
///     r#"{"id":"u1","username":"ada","phone":"0123456789"}"#,
/// )
/// .expect("user decodes");
/// assert_eq!(user.email, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// Primary key.
    pub id: String,
    /// Unique login name.
    pub username: String,
    /// Contact address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact number; masked in logs.
    pub phone: String,
    /// Date of birth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
}

impl Entity for User {
    const RESOURCE: &'static str = "user";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", FieldRole::Key, FieldKind::String),
        FieldDescriptor::new("username", FieldRole::Index, FieldKind::String),
        FieldDescriptor::new("email", FieldRole::Searchable, FieldKind::String),
        FieldDescriptor::new("phone", FieldRole::Searchable, FieldKind::String),
        FieldDescriptor::new("dateOfBirth", FieldRole::Searchable, FieldKind::Timestamp),
    ];
}

/// Inclusive timestamp range; either bound may be open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    /// Earliest accepted instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<DateTime<Utc>>,
    /// Latest accepted instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Whether `value` lies inside the range. A missing value only matches an
    /// unbounded range.
    pub fn contains(&self, value: Option<&DateTime<Utc>>) -> bool {
        if self.min.is_none() && self.max.is_none() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        self.min.is_none_or(|min| *value >= min) && self.max.is_none_or(|max| *value <= max)
    }
}

/// Search predicates for users.
///
/// `id` and `phone` match exactly; `username` and `email` match by prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserFilter {
    /// Exact id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Username prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Email prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Exact phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Date of birth range.
    pub date_of_birth: DateRange,
}

impl SearchCriteria for UserFilter {
    const FIELDS: &'static [FilterField] = &[
        FilterField::new("id", "id", FieldKind::String),
        FilterField::new("username", "username", FieldKind::String),
        FilterField::new("email", "email", FieldKind::String),
        FilterField::new("phone", "phone", FieldKind::String),
        FilterField::new("dateOfBirth.min", "dateOfBirth.min", FieldKind::Timestamp),
        FilterField::new("dateOfBirth.max", "dateOfBirth.max", FieldKind::Timestamp),
    ];
}

static USERNAME_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static EMAIL_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static PHONE_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn compiled(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    field: &str,
    pattern: &str,
) -> Result<&'static Regex, ValidatorError> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|err| ValidatorError::rule(field, err.to_string()))
}

/// Rule-based validator for [`User`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UserValidator;

impl UserValidator {
    fn check(&self, user: &User) -> Result<Vec<FieldError>, ValidatorError> {
        let mut errors = Vec::new();

        required(&mut errors, "id", &user.id);
        max_length(&mut errors, "id", &user.id, ID_MAX);

        required(&mut errors, "username", &user.username);
        max_length(&mut errors, "username", &user.username, USERNAME_MAX);
        let username_re = compiled(&USERNAME_RE, "username", r"^[A-Za-z0-9._-]+$")?;
        pattern(&mut errors, "username", &user.username, username_re);

        if let Some(email) = user.email.as_deref() {
            max_length(&mut errors, "email", email, EMAIL_MAX);
            let email_re = compiled(&EMAIL_RE, "email", r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?;
            pattern(&mut errors, "email", email, email_re);
        }

        required(&mut errors, "phone", &user.phone);
        max_length(&mut errors, "phone", &user.phone, PHONE_MAX);
        let phone_re = compiled(&PHONE_RE, "phone", r"^\+?[0-9 ()-]+$")?;
        pattern(&mut errors, "phone", &user.phone, phone_re);

        Ok(errors)
    }
}

#[async_trait]
impl Validator for UserValidator {
    type Entity = User;

    async fn validate(&self, entity: &User) -> Result<Vec<FieldError>, ValidatorError> {
        self.check(entity)
    }
}

fn required(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "required", format!("{field} is required")));
    }
}

fn max_length(errors: &mut Vec<FieldError>, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            "max_length",
            format!("{field} must be at most {max} characters"),
        ));
    }
}

// Blank values are reported by `required` only.
fn pattern(errors: &mut Vec<FieldError>, field: &str, value: &str, re: &Regex) {
    if !value.is_empty() && !re.is_match(value) {
        errors.push(FieldError::new(
            field,
            "pattern",
            format!("{field} has an invalid format"),
        ));
    }
}
