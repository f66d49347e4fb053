//! Redaction of sensitive fields before entity snapshots reach the logs.
//!
//! Masking only ever touches the copy handed to `tracing`. Values returned to
//! clients or written to the store are never altered.

use serde::Serialize;
use serde_json::{Map, Value};

/// Replace every character of `fields[field]` past `keep_prefix` with
/// `mask_char`.
///
/// Non-string values and strings no longer than the prefix are left alone.
/// Lengths are counted in characters, so the masked value has the same
/// character count as the original. Applying the same mask twice is a no-op.
///
/// # Examples
/// ```
/// use serde_json::{json, Map, Value};
/// use users_api::domain::mask;
///
/// let mut fields = Map::new();
/// fields.insert("phone".to_owned(), json!("0123456789"));
/// mask(&mut fields, "phone", 3, '*');
/// assert_eq!(fields.get("phone"), Some(&Value::from("012*******")));
/// ```
pub fn mask(fields: &mut Map<String, Value>, field: &str, keep_prefix: usize, mask_char: char) {
    let Some(Value::String(text)) = fields.get_mut(field) else {
        return;
    };
    if text.chars().count() <= keep_prefix {
        return;
    }
    let masked: String = text
        .chars()
        .enumerate()
        .map(|(position, ch)| if position < keep_prefix { ch } else { mask_char })
        .collect();
    *text = masked;
}

/// A single configured redaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRule {
    field: String,
    keep_prefix: usize,
    mask_char: char,
}

impl MaskRule {
    /// Mask `field`, keeping its first `keep_prefix` characters.
    pub fn new(field: impl Into<String>, keep_prefix: usize, mask_char: char) -> Self {
        Self {
            field: field.into(),
            keep_prefix,
            mask_char,
        }
    }
}

/// Ordered set of redactions applied to logged field maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMasker {
    rules: Vec<MaskRule>,
}

impl Default for LogMasker {
    /// Phone numbers keep their first three characters.
    fn default() -> Self {
        Self::new(vec![MaskRule::new("phone", 3, '*')])
    }
}

impl LogMasker {
    /// Build a masker from explicit rules.
    pub fn new(rules: Vec<MaskRule>) -> Self {
        Self { rules }
    }

    /// A masker that leaves every field untouched.
    pub fn disabled() -> Self {
        Self { rules: Vec::new() }
    }

    /// Apply every rule to `fields` in place.
    pub fn apply(&self, fields: &mut Map<String, Value>) {
        for rule in &self.rules {
            mask(fields, &rule.field, rule.keep_prefix, rule.mask_char);
        }
    }

    /// Serialise `value` and return a masked copy for logging.
    ///
    /// Values that do not serialise to an object are returned unmasked;
    /// values that fail to serialise become `null`.
    pub fn masked<T: Serialize + ?Sized>(&self, value: &T) -> Value {
        match serde_json::to_value(value) {
            Ok(Value::Object(mut fields)) => {
                self.apply(&mut fields);
                Value::Object(fields)
            }
            Ok(other) => other,
            Err(_) => Value::Null,
        }
    }
}
