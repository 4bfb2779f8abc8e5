//! In-memory document service.
//!
//! Stores JSON objects keyed by their `_id` field. `find` filters by equality on
//! every query field and answers with a `{ "total", "data" }` page.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Map, Value, json};

use crate::cache::lock::{rw_read, rw_write};

use super::context::{EntityId, Params};
use super::error::ServiceError;
use super::service::Service;

const SOURCE: &str = "pipeline::memory";
pub const ID_FIELD: &str = "_id";

#[derive(Default)]
pub struct MemoryService {
    documents: RwLock<Vec<Map<String, Value>>>,
    calls: AtomicUsize,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the service. Documents without an `_id` get a generated one;
    /// non-object values are rejected.
    pub fn with_documents(
        documents: impl IntoIterator<Item = Value>,
    ) -> Result<Self, ServiceError> {
        let stored = documents
            .into_iter()
            .map(into_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            documents: RwLock::new(stored),
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of service methods that actually ran.
    pub fn backend_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.documents, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Service for MemoryService {
    fn find(&self, params: &Params) -> Result<Value, ServiceError> {
        self.record_call();
        let filter = match params.query.as_ref() {
            None | Some(Value::Null) => None,
            Some(Value::Object(filter)) => Some(filter),
            Some(_) => return Err(ServiceError::invalid_data("query must be an object")),
        };

        let documents = rw_read(&self.documents, SOURCE, "find");
        let data: Vec<Value> = documents
            .iter()
            .filter(|doc| filter.is_none_or(|filter| matches_filter(doc, filter)))
            .map(|doc| Value::Object(doc.clone()))
            .collect();

        Ok(json!({ "total": data.len(), "data": data }))
    }

    fn get(&self, id: &EntityId, _params: &Params) -> Result<Value, ServiceError> {
        self.record_call();
        let documents = rw_read(&self.documents, SOURCE, "get");
        documents
            .iter()
            .find(|doc| has_id(doc, id))
            .map(|doc| Value::Object(doc.clone()))
            .ok_or_else(|| ServiceError::not_found(id.as_str()))
    }

    fn create(&self, data: Value, _params: &Params) -> Result<Value, ServiceError> {
        self.record_call();
        let document = into_document(data)?;
        let created = Value::Object(document.clone());
        rw_write(&self.documents, SOURCE, "create").push(document);
        Ok(created)
    }

    fn update(&self, id: &EntityId, data: Value, _params: &Params) -> Result<Value, ServiceError> {
        self.record_call();
        let Value::Object(mut replacement) = data else {
            return Err(ServiceError::invalid_data("update data must be an object"));
        };
        replacement.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let mut documents = rw_write(&self.documents, SOURCE, "update");
        let slot = documents
            .iter_mut()
            .find(|doc| has_id(doc, id))
            .ok_or_else(|| ServiceError::not_found(id.as_str()))?;
        *slot = replacement;
        Ok(Value::Object(slot.clone()))
    }

    fn patch(&self, id: &EntityId, data: Value, _params: &Params) -> Result<Value, ServiceError> {
        self.record_call();
        let Value::Object(changes) = data else {
            return Err(ServiceError::invalid_data("patch data must be an object"));
        };

        let mut documents = rw_write(&self.documents, SOURCE, "patch");
        let doc = documents
            .iter_mut()
            .find(|doc| has_id(doc, id))
            .ok_or_else(|| ServiceError::not_found(id.as_str()))?;
        for (field, value) in changes {
            if field != ID_FIELD {
                doc.insert(field, value);
            }
        }
        Ok(Value::Object(doc.clone()))
    }

    fn remove(&self, id: &EntityId, _params: &Params) -> Result<Value, ServiceError> {
        self.record_call();
        let mut documents = rw_write(&self.documents, SOURCE, "remove");
        let index = documents
            .iter()
            .position(|doc| has_id(doc, id))
            .ok_or_else(|| ServiceError::not_found(id.as_str()))?;
        Ok(Value::Object(documents.remove(index)))
    }
}

fn into_document(data: Value) -> Result<Map<String, Value>, ServiceError> {
    let Value::Object(mut document) = data else {
        return Err(ServiceError::invalid_data("documents must be JSON objects"));
    };
    let has_usable_id = matches!(
        document.get(ID_FIELD),
        Some(Value::String(_) | Value::Number(_))
    );
    if !has_usable_id {
        document.insert(
            ID_FIELD.to_string(),
            Value::String(EntityId::generate().to_string()),
        );
    }
    Ok(document)
}

fn has_id(doc: &Map<String, Value>, id: &EntityId) -> bool {
    match doc.get(ID_FIELD) {
        Some(Value::String(value)) => value == id.as_str(),
        Some(Value::Number(value)) => value.to_string() == id.as_str(),
        _ => false,
    }
}

fn matches_filter(doc: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}
