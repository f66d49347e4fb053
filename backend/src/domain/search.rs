//! Query-string decoding for search endpoints.
//!
//! [`SearchParameters`] is built once per criteria type at startup. It holds
//! the parameter index (query name to filter target) and the filter index
//! (which targets build predicates, as opposed to `page`, `limit` and `sort`).
//! Each request then runs [`SearchParameters::decode`] to obtain a typed
//! [`Filter`].

use std::collections::HashMap;
use std::marker::PhantomData;

use chrono::DateTime;
use pagination::{PageLimits, PageRequest};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value, json};
use tracing::debug;

use crate::domain::{AttributeMetadata, Error, FieldKind, FieldRole, SchemaError};

/// Query parameter carrying the one-based page number.
pub const PAGE_PARAM: &str = "page";
/// Query parameter carrying the page size.
pub const LIMIT_PARAM: &str = "limit";
/// Query parameter carrying the sort field, prefixed with `-` for descending.
pub const SORT_PARAM: &str = "sort";

/// A query parameter that feeds a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    /// Query-string name.
    pub param: &'static str,
    /// Dotted path inside the criteria object, e.g. `dateOfBirth.min`.
    pub path: &'static str,
    /// Expected value shape.
    pub kind: FieldKind,
}

impl FilterField {
    /// Declare a predicate parameter.
    pub const fn new(param: &'static str, path: &'static str, kind: FieldKind) -> Self {
        Self { param, path, kind }
    }

    fn root(&self) -> &'static str {
        self.path.split('.').next().unwrap_or(self.path)
    }
}

/// Typed search criteria decoded from the query string.
///
/// Implementors deserialise from the object built from [`Self::FIELDS`] and
/// must tolerate absent fields.
pub trait SearchCriteria: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Predicate parameters accepted by the search endpoint.
    const FIELDS: &'static [FilterField];
}

/// Requested ordering of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOrder {
    /// Entity field to order by.
    pub field: String,
    /// Whether to order from largest to smallest.
    pub descending: bool,
}

/// A decoded search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter<F> {
    /// Page number and size.
    #[serde(skip)]
    pub page: PageRequest,
    /// Optional ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    /// Typed predicates.
    pub criteria: F,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamTarget {
    Page,
    Limit,
    Sort,
    Criterion(usize),
}

/// Parameter and filter indices for one criteria type.
#[derive(Debug, Clone)]
pub struct SearchParameters<F> {
    param_index: HashMap<&'static str, ParamTarget>,
    filter_index: Vec<FilterField>,
    sortable: Vec<&'static str>,
    limits: PageLimits,
    criteria: PhantomData<fn() -> F>,
}

impl<F: SearchCriteria> SearchParameters<F> {
    /// Build the indices for `F` against an entity's metadata.
    ///
    /// Sorting is allowed on key, index and searchable fields.
    ///
    /// # Errors
    /// Returns [`SchemaError::UnknownFilterField`] when a predicate targets a
    /// field the entity does not declare.
    pub fn resolve(metadata: &AttributeMetadata, limits: PageLimits) -> Result<Self, SchemaError> {
        let mut param_index = HashMap::from([
            (PAGE_PARAM, ParamTarget::Page),
            (LIMIT_PARAM, ParamTarget::Limit),
            (SORT_PARAM, ParamTarget::Sort),
        ]);
        for (position, field) in F::FIELDS.iter().enumerate() {
            if !metadata.is_declared(field.root()) {
                return Err(SchemaError::UnknownFilterField {
                    param: field.param,
                    field: field.path,
                });
            }
            param_index.insert(field.param, ParamTarget::Criterion(position));
        }
        let sortable = metadata
            .fields()
            .iter()
            .filter(|field| field.role != FieldRole::Plain)
            .map(|field| field.name)
            .collect();

        Ok(Self {
            param_index,
            filter_index: F::FIELDS.to_vec(),
            sortable,
            limits,
            criteria: PhantomData,
        })
    }

    /// Page size bounds applied while decoding.
    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Decode raw query pairs into a filter.
    ///
    /// Unknown parameters are ignored and empty values are treated as absent.
    /// When a parameter repeats, the last value wins.
    ///
    /// # Errors
    /// Returns an `invalid_request` error when a value cannot be read as its
    /// declared kind or the sort field is not sortable.
    pub fn decode<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Filter<F>, Error>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut page = None;
        let mut limit = None;
        let mut sort = None;
        let mut criteria = Map::new();

        for (name, raw) in pairs {
            let (name, raw) = (name.as_ref(), raw.as_ref());
            let Some(target) = self.param_index.get(name) else {
                debug!(param = name, "ignoring unrecognised search parameter");
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }
            match *target {
                ParamTarget::Page => page = Some(parse_integer(PAGE_PARAM, raw)?),
                ParamTarget::Limit => limit = Some(parse_integer(LIMIT_PARAM, raw)?),
                ParamTarget::Sort => sort = Some(self.parse_sort(raw)?),
                ParamTarget::Criterion(position) => {
                    let Some(field) = self.filter_index.get(position) else {
                        continue;
                    };
                    let value = coerce(field, raw)?;
                    insert_path(&mut criteria, field.path, value);
                }
            }
        }

        let criteria = serde_json::from_value::<F>(Value::Object(criteria)).map_err(|err| {
            Error::invalid_request("search criteria could not be decoded").with_details(json!({
                "code": "invalid_criteria",
                "reason": err.to_string(),
            }))
        })?;

        Ok(Filter {
            page: PageRequest::clamped(page, limit, self.limits),
            sort,
            criteria,
        })
    }

    fn parse_sort(&self, raw: &str) -> Result<SortOrder, Error> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw.strip_prefix('+').unwrap_or(raw), false),
        };
        if !self.sortable.contains(&field) {
            return Err(param_error(
                SORT_PARAM,
                raw,
                "unsortable_field",
                format!("cannot sort by {field}"),
            ));
        }
        Ok(SortOrder {
            field: field.to_owned(),
            descending,
        })
    }
}

fn parse_integer(param: &str, raw: &str) -> Result<i64, Error> {
    raw.trim().parse::<i64>().map_err(|_| {
        param_error(
            param,
            raw,
            FieldKind::Integer.invalid_code(),
            format!("{param} must be an integer"),
        )
    })
}

fn coerce(field: &FilterField, raw: &str) -> Result<Value, Error> {
    let invalid = |expected: &str| {
        param_error(
            field.param,
            raw,
            field.kind.invalid_code(),
            format!("{} must be {expected}", field.param),
        )
    };
    match field.kind {
        FieldKind::String => Ok(Value::String(raw.to_owned())),
        FieldKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(|parsed| Value::Number(Number::from(parsed)))
            .map_err(|_| invalid("an integer")),
        FieldKind::Boolean => raw
            .trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| invalid("true or false")),
        FieldKind::Timestamp => DateTime::parse_from_rfc3339(raw.trim())
            .map(|timestamp| Value::String(timestamp.to_rfc3339()))
            .map_err(|_| invalid("an RFC 3339 timestamp")),
    }
}

fn param_error(param: &str, raw: &str, code: &str, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": param,
        "value": raw,
        "code": code,
    }))
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}
