//! Partial updates that touch only the fields a client actually sent.
//!
//! A patch body is parsed in two stages from the same bytes. The first stage
//! produces an ordered JSON tree, which preserves which fields were present,
//! including explicit `null`s. The second stage reads the typed entity from
//! that tree for validation. Only the tree-derived [`PatchMap`] reaches the
//! store, so fields the client omitted are never overwritten with defaults.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::domain::{AttributeMetadata, Entity, Error, KeyValues};

/// Ordered field map holding exactly the declared fields a client supplied.
///
/// ## Invariants
/// - Every key field is present, with the value bound from the request path.
/// - Key fields come first, followed by body fields in the order received.
/// - Fields the entity does not declare are dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PatchMap(Map<String, Value>);

impl PatchMap {
    /// Borrow the underlying field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Whether the client supplied `name` (or it is a key field).
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Value supplied for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Result of decoding a patch request.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch<T> {
    /// Typed view used for validation; omitted fields hold defaults.
    pub entity: T,
    /// Fields to write.
    pub fields: PatchMap,
}

/// Decode a patch body against the entity schema.
///
/// # Errors
/// Returns an `invalid_request` error when the body is not a JSON object or
/// when a supplied value does not fit the entity's field type.
///
/// # Examples
/// ```
/// use users_api::domain::{build_patch, ActionLabels, AttributeMetadata, User};
///
/// let metadata = AttributeMetadata::resolve::<User>(ActionLabels::default()).expect("schema");
/// let keys = metadata.bind_keys(&["42"]).expect("key");
/// let patch = build_patch::<User>(br#"{"id":"7","phone":"555"}"#, &metadata, &keys)
///     .expect("patch decodes");
/// assert_eq!(patch.fields.names().collect::<Vec<_>>(), vec!["id", "phone"]);
/// assert_eq!(patch.entity.id, "42");
/// ```
pub fn build_patch<T: Entity>(
    body: &[u8],
    metadata: &AttributeMetadata,
    keys: &KeyValues,
) -> Result<Patch<T>, Error> {
    let supplied = read_object(body)?;

    let mut fields = Map::new();
    for (name, value) in keys.iter() {
        fields.insert(name.clone(), value.clone());
    }
    for (name, value) in supplied {
        if metadata.is_key(&name) || !metadata.is_declared(&name) {
            continue;
        }
        fields.insert(name, value);
    }

    // Explicit nulls stay in the patch but read as defaults in the typed view.
    let typed: Map<String, Value> = fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let entity = read_entity::<T>(typed)?;

    Ok(Patch {
        entity,
        fields: PatchMap(fields),
    })
}

/// Parse a request body that must be a JSON object.
///
/// # Errors
/// Returns an `invalid_request` error with code `malformed_body`.
pub fn read_object(body: &[u8]) -> Result<Map<String, Value>, Error> {
    let tree: Value = serde_json::from_slice(body).map_err(|err| {
        Error::invalid_request("request body is not valid JSON").with_details(json!({
            "code": "malformed_body",
            "reason": err.to_string(),
        }))
    })?;
    match tree {
        Value::Object(fields) => Ok(fields),
        _ => Err(
            Error::invalid_request("request body must be a JSON object").with_details(json!({
                "code": "malformed_body",
            })),
        ),
    }
}

/// Read a typed entity from a parsed field map.
///
/// # Errors
/// Returns an `invalid_request` error with code `invalid_field_type`.
pub fn read_entity<T: Entity>(fields: Map<String, Value>) -> Result<T, Error> {
    serde_json::from_value::<T>(Value::Object(fields)).map_err(|err| {
        Error::invalid_request(format!("{} has invalid field values", T::RESOURCE)).with_details(
            json!({
                "code": "invalid_field_type",
                "reason": err.to_string(),
            }),
        )
    })
}
