//! Static entity schemas and the attribute metadata derived from them.
//!
//! Every entity served by the resource endpoint declares its fields once, at
//! compile time, through [`Entity::FIELDS`]. [`AttributeMetadata::resolve`]
//! turns that declaration into the key, index and label data consulted by
//! every request. Metadata is built at startup and shared read-only.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value, json};
use thiserror::Error;

use crate::domain::Error;

/// Role a field plays in identifying or finding an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Part of the primary key; taken from the request path, never the body.
    Key,
    /// Part of an alternate unique index enforced by the store.
    Index,
    /// Usable in search predicates and as a sort field.
    Searchable,
    /// Stored and returned but never searched.
    Plain,
}

/// JSON shape of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// RFC 3339 timestamp carried as a string.
    Timestamp,
}

impl FieldKind {
    /// Machine-readable code reported when a raw value does not match.
    pub(crate) fn invalid_code(self) -> &'static str {
        match self {
            Self::String => "invalid_string",
            Self::Integer => "invalid_integer",
            Self::Boolean => "invalid_boolean",
            Self::Timestamp => "invalid_timestamp",
        }
    }
}

/// One entry of an entity's static schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// JSON field name, as it appears on the wire.
    pub name: &'static str,
    /// Identification role.
    pub role: FieldRole,
    /// Value shape.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Declare a field.
    pub const fn new(name: &'static str, role: FieldRole, kind: FieldKind) -> Self {
        Self { name, role, kind }
    }
}

/// A record type served through the resource endpoint.
///
/// Implementors serialise to a JSON object whose field names match
/// [`Entity::FIELDS`]. Decoding must tolerate missing fields (for example via
/// `#[serde(default)]`) so that partial patch bodies produce a typed value.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Singular resource name used in messages and logs.
    const RESOURCE: &'static str;
    /// Declared fields in wire order.
    const FIELDS: &'static [FieldDescriptor];
}

/// Per-operation labels attached to audit and error logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLabels {
    /// Label for full creation.
    pub create: String,
    /// Label for full replacement.
    pub update: String,
    /// Label for partial update.
    pub patch: String,
    /// Label for removal.
    pub delete: String,
}

impl Default for ActionLabels {
    fn default() -> Self {
        Self {
            create: "create".to_owned(),
            update: "update".to_owned(),
            patch: "patch".to_owned(),
            delete: "delete".to_owned(),
        }
    }
}

/// Startup failures raised while resolving an entity schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema declares no key field.
    #[error("{resource} declares no key field")]
    MissingKey { resource: &'static str },
    /// Two fields share a name.
    #[error("{resource} declares field {field} more than once")]
    DuplicateField {
        resource: &'static str,
        field: &'static str,
    },
    /// Keys must be strings or integers so they can be bound from a path.
    #[error("{resource} key {field} must be a string or integer field")]
    UnsupportedKeyKind {
        resource: &'static str,
        field: &'static str,
    },
    /// A search parameter targets a field the entity does not declare.
    #[error("search parameter {param} targets undeclared field {field}")]
    UnknownFilterField {
        param: &'static str,
        field: &'static str,
    },
}

/// Key and index metadata for one entity type.
///
/// ## Invariants
/// - At least one key field.
/// - Field names are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMetadata {
    resource: &'static str,
    fields: Vec<FieldDescriptor>,
    keys: Vec<FieldDescriptor>,
    indexes: Vec<FieldDescriptor>,
    actions: ActionLabels,
}

impl AttributeMetadata {
    /// Resolve metadata for `T` from its static schema.
    ///
    /// # Errors
    /// Returns [`SchemaError`] when the schema has no key, repeats a field or
    /// declares a key that cannot be bound from a path segment.
    ///
    /// # Examples
    /// ```
    /// use users_api::domain::{ActionLabels, AttributeMetadata, User};
    ///
    /// let metadata = AttributeMetadata::resolve::<User>(ActionLabels::default())
    ///     .expect("user schema is valid");
    /// assert_eq!(metadata.key_names().collect::<Vec<_>>(), vec!["id"]);
    /// ```
    pub fn resolve<T: Entity>(actions: ActionLabels) -> Result<Self, SchemaError> {
        Self::from_fields(T::RESOURCE, T::FIELDS, actions)
    }

    pub(crate) fn from_fields(
        resource: &'static str,
        fields: &'static [FieldDescriptor],
        actions: ActionLabels,
    ) -> Result<Self, SchemaError> {
        for (position, field) in fields.iter().enumerate() {
            if fields
                .iter()
                .skip(position + 1)
                .any(|other| other.name == field.name)
            {
                return Err(SchemaError::DuplicateField {
                    resource,
                    field: field.name,
                });
            }
        }

        let keys: Vec<FieldDescriptor> = fields
            .iter()
            .filter(|field| field.role == FieldRole::Key)
            .copied()
            .collect();
        if keys.is_empty() {
            return Err(SchemaError::MissingKey { resource });
        }
        if let Some(bad) = keys
            .iter()
            .find(|key| !matches!(key.kind, FieldKind::String | FieldKind::Integer))
        {
            return Err(SchemaError::UnsupportedKeyKind {
                resource,
                field: bad.name,
            });
        }

        let indexes = fields
            .iter()
            .filter(|field| field.role == FieldRole::Index)
            .copied()
            .collect();

        Ok(Self {
            resource,
            fields: fields.to_vec(),
            keys,
            indexes,
            actions,
        })
    }

    /// Singular resource name.
    pub fn resource_name(&self) -> &'static str {
        self.resource
    }

    /// Labels attached to mutation logs.
    pub fn actions(&self) -> &ActionLabels {
        &self.actions
    }

    /// Key fields in declaration order.
    pub fn keys(&self) -> &[FieldDescriptor] {
        &self.keys
    }

    /// Names of the key fields in declaration order.
    pub fn key_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.keys.iter().map(|key| key.name)
    }

    /// Unique index fields in declaration order.
    pub fn indexes(&self) -> &[FieldDescriptor] {
        &self.indexes
    }

    /// All declared fields.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a declared field by wire name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Whether `name` is a declared field.
    pub fn is_declared(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Whether `name` is a key field.
    pub fn is_key(&self, name: &str) -> bool {
        self.keys.iter().any(|key| key.name == name)
    }

    /// Bind identifying path segments to the key fields, in order.
    ///
    /// # Errors
    /// Returns an `invalid_request` error when a segment is missing, empty or
    /// cannot be read as the key's declared kind.
    pub fn bind_keys(&self, segments: &[&str]) -> Result<KeyValues, Error> {
        let mut values = Map::new();
        for (position, key) in self.keys.iter().enumerate() {
            let raw = segments
                .get(position)
                .map(|segment| segment.trim())
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| {
                    key_error(key.name, "missing_key", format!("missing required key: {}", key.name))
                })?;
            let value = match key.kind {
                FieldKind::Integer => raw
                    .parse::<i64>()
                    .map(|parsed| Value::Number(Number::from(parsed)))
                    .map_err(|_| {
                        key_error(
                            key.name,
                            key.kind.invalid_code(),
                            format!("{} must be an integer", key.name),
                        )
                    })?,
                _ => Value::String(raw.to_owned()),
            };
            values.insert(key.name.to_owned(), value);
        }
        if segments.len() > self.keys.len() {
            return Err(Error::invalid_request("too many key segments").with_details(json!({
                "expected": self.keys.len(),
                "received": segments.len(),
                "code": "unexpected_key_segment",
            })));
        }
        Ok(KeyValues(values))
    }

    /// Reconcile the key fields of a full replacement body with the path.
    ///
    /// Absent, `null` or empty keys are filled from the path. A different
    /// non-empty key in the body is rejected.
    ///
    /// # Errors
    /// Returns an `invalid_request` error with code `key_mismatch`.
    pub fn check_keys(&self, body: &mut Map<String, Value>, keys: &KeyValues) -> Result<(), Error> {
        for (name, expected) in keys.iter() {
            let supplied = body.get(name).filter(|value| !is_blank(value)).cloned();
            match supplied {
                None => {
                    body.insert(name.clone(), expected.clone());
                }
                Some(value) if &value == expected => {}
                Some(_) => {
                    return Err(key_error(
                        name,
                        "key_mismatch",
                        format!("{name} in the body does not match the request path"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Extract the key values of a stored or submitted document.
    ///
    /// Returns `None` when any key is absent or blank.
    pub fn key_of(&self, document: &Map<String, Value>) -> Option<KeyValues> {
        let mut values = Map::new();
        for key in &self.keys {
            let value = document.get(key.name).filter(|value| !is_blank(value))?;
            values.insert(key.name.to_owned(), value.clone());
        }
        Some(KeyValues(values))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn key_error(field: &str, code: &str, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "code": code,
    }))
}

/// Key field values identifying one entity, in key declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyValues(Map<String, Value>);

impl KeyValues {
    /// Value of one key field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Iterate key fields and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Stable string form used as a storage key and in log lines.
    pub fn canonical(&self) -> String {
        self.0
            .values()
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for KeyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
