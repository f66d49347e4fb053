//! Document store backed by an ordered in-memory map.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use pagination::SearchResult;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::ports::{EntityService, ServiceError};
use crate::domain::{
    AttributeMetadata, Entity, Filter, KeyValues, PatchMap, ResultCode, SearchCriteria, SortOrder,
};

type Document = Map<String, Value>;

/// Predicates a criteria type applies to stored entities.
pub trait DocumentQuery<T>: SearchCriteria {
    /// Whether `entity` satisfies every supplied predicate.
    fn matches(&self, entity: &T) -> bool;
}

/// Entity store holding JSON documents keyed by canonical key.
///
/// ## Invariants
/// - Documents are unique by key.
/// - Non-null index field values are unique across documents.
pub struct InMemoryDocumentStore<T, F> {
    metadata: Arc<AttributeMetadata>,
    documents: RwLock<BTreeMap<String, Document>>,
    marker: PhantomData<fn() -> (T, F)>,
}

impl<T, F> InMemoryDocumentStore<T, F>
where
    T: Entity,
    F: DocumentQuery<T>,
{
    /// Create an empty store for the entity described by `metadata`.
    pub fn new(metadata: Arc<AttributeMetadata>) -> Self {
        Self {
            metadata,
            documents: RwLock::new(BTreeMap::new()),
            marker: PhantomData,
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn encode(&self, entity: &T) -> Result<(String, Document), ServiceError> {
        let document = match serde_json::to_value(entity) {
            Ok(Value::Object(document)) => document,
            Ok(_) => {
                return Err(ServiceError::query(format!(
                    "{} did not serialise to an object",
                    self.metadata.resource_name()
                )));
            }
            Err(err) => return Err(ServiceError::query(err.to_string())),
        };
        let key = self.metadata.key_of(&document).ok_or_else(|| {
            ServiceError::query(format!("{} has no key", self.metadata.resource_name()))
        })?;
        Ok((key.canonical(), document))
    }

    fn decode(document: &Document) -> Result<T, ServiceError> {
        serde_json::from_value(Value::Object(document.clone()))
            .map_err(|err| ServiceError::query(err.to_string()))
    }

    fn index_taken(&self, documents: &BTreeMap<String, Document>, key: &str, candidate: &Document) -> bool {
        self.metadata.indexes().iter().any(|index| {
            let Some(value) = candidate.get(index.name).filter(|value| !value.is_null()) else {
                return false;
            };
            documents
                .iter()
                .any(|(other, document)| other != key && document.get(index.name) == Some(value))
        })
    }
}

#[async_trait]
impl<T, F> EntityService for InMemoryDocumentStore<T, F>
where
    T: Entity,
    F: DocumentQuery<T>,
{
    type Entity = T;
    type Criteria = F;

    async fn all(&self) -> Result<Vec<T>, ServiceError> {
        let documents = self.documents.read().await;
        documents.values().map(Self::decode).collect()
    }

    async fn load(&self, keys: &KeyValues) -> Result<Option<T>, ServiceError> {
        let documents = self.documents.read().await;
        documents.get(&keys.canonical()).map(Self::decode).transpose()
    }

    async fn create(&self, entity: &T) -> Result<ResultCode, ServiceError> {
        let (key, document) = self.encode(entity)?;
        let mut documents = self.documents.write().await;
        if documents.contains_key(&key) || self.index_taken(&documents, &key, &document) {
            return Ok(ResultCode::CONFLICT);
        }
        documents.insert(key, document);
        Ok(ResultCode::APPLIED)
    }

    async fn update(&self, entity: &T) -> Result<ResultCode, ServiceError> {
        let (key, document) = self.encode(entity)?;
        let mut documents = self.documents.write().await;
        if !documents.contains_key(&key) {
            return Ok(ResultCode::NOT_FOUND);
        }
        if self.index_taken(&documents, &key, &document) {
            return Ok(ResultCode::CONFLICT);
        }
        documents.insert(key, document);
        Ok(ResultCode::APPLIED)
    }

    async fn patch(&self, fields: &PatchMap) -> Result<ResultCode, ServiceError> {
        let keys = self.metadata.key_of(fields.fields()).ok_or_else(|| {
            ServiceError::query(format!("{} patch has no key", self.metadata.resource_name()))
        })?;
        let key = keys.canonical();
        let mut documents = self.documents.write().await;
        let Some(current) = documents.get(&key) else {
            return Ok(ResultCode::NOT_FOUND);
        };

        let mut merged = current.clone();
        for (name, value) in fields.fields() {
            if value.is_null() {
                merged.remove(name);
            } else {
                merged.insert(name.clone(), value.clone());
            }
        }
        if self.index_taken(&documents, &key, &merged) {
            return Ok(ResultCode::CONFLICT);
        }
        Self::decode(&merged)?;
        documents.insert(key, merged);
        Ok(ResultCode::APPLIED)
    }

    async fn delete(&self, keys: &KeyValues) -> Result<ResultCode, ServiceError> {
        let mut documents = self.documents.write().await;
        Ok(match documents.remove(&keys.canonical()) {
            Some(_) => ResultCode::APPLIED,
            None => ResultCode::NOT_FOUND,
        })
    }

    async fn search(
        &self,
        filter: &Filter<F>,
        limit: u32,
        offset: u64,
    ) -> Result<SearchResult<T>, ServiceError> {
        let documents = self.documents.read().await;
        let mut hits = Vec::new();
        for document in documents.values() {
            let entity = Self::decode(document)?;
            if filter.criteria.matches(&entity) {
                hits.push((document, entity));
            }
        }
        if let Some(order) = filter.sort.as_ref() {
            hits.sort_by(|(left, _), (right, _)| compare_field(left, right, order));
        }

        let total = u64::try_from(hits.len()).unwrap_or(u64::MAX);
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        let list: Vec<T> = hits
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(_, entity)| entity)
            .collect();
        debug!(total, returned = list.len(), offset, limit, "search evaluated");
        Ok(SearchResult::new(list, total))
    }
}

// Missing values sort after present ones in either direction.
fn compare_field(left: &Document, right: &Document, order: &SortOrder) -> Ordering {
    match (left.get(&order.field), right.get(&order.field)) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), Some(_)) => Ordering::Greater,
        (Some(_), None | Some(Value::Null)) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b);
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}
