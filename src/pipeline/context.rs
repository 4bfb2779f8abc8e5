//! Request descriptor passed through a service's hook chains.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use uuid::Uuid;

/// The six service methods a pipeline dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Find,
    Create,
    Update,
    Patch,
    Remove,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Find => "find",
            Method::Create => "create",
            Method::Update => "update",
            Method::Patch => "patch",
            Method::Remove => "remove",
        }
    }

    /// `get` and `find`: the methods whose results may be cached.
    pub fn is_read(self) -> bool {
        matches!(self, Method::Get | Method::Find)
    }

    pub fn is_mutation(self) -> bool {
        !self.is_read()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque entity identifier.
///
/// Accepts JSON strings and numbers on input; always carried in string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawEntityId")]
pub struct EntityId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntityId {
    Text(String),
    Number(Number),
}

impl From<RawEntityId> for EntityId {
    fn from(raw: RawEntityId) -> Self {
        match raw {
            RawEntityId::Text(text) => Self(text),
            RawEntityId::Number(number) => Self(number.to_string()),
        }
    }
}

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

/// Call parameters. Only the query takes part in caching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pub query: Option<Value>,
}

impl Params {
    pub fn with_query(query: Value) -> Self {
        Self { query: Some(query) }
    }
}

/// Mutable context handed to every hook of one service call.
///
/// A before hook that sets `result` makes the pipeline skip the service
/// method; `result_from_cache` records that the result came from a cache.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub method: Method,
    pub id: Option<EntityId>,
    pub params: Params,
    pub data: Option<Value>,
    pub result: Option<Arc<Value>>,
    pub result_from_cache: bool,
}

impl HookContext {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            id: None,
            params: Params::default(),
            data: None,
            result: None,
            result_from_cache: false,
        }
    }

    pub fn get(id: impl Into<EntityId>, query: Option<Value>) -> Self {
        Self::new(Method::Get).with_id(id).with_query(query)
    }

    pub fn find(query: Option<Value>) -> Self {
        Self::new(Method::Find).with_query(query)
    }

    pub fn create(data: Value) -> Self {
        Self::new(Method::Create).with_data(data)
    }

    pub fn update(id: impl Into<EntityId>, data: Value) -> Self {
        Self::new(Method::Update).with_id(id).with_data(data)
    }

    pub fn patch(id: impl Into<EntityId>, data: Value) -> Self {
        Self::new(Method::Patch).with_id(id).with_data(data)
    }

    pub fn remove(id: impl Into<EntityId>) -> Self {
        Self::new(Method::Remove).with_id(id)
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_query(mut self, query: Option<Value>) -> Self {
        self.params.query = query;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The result as a plain value, if any.
    pub fn result_value(&self) -> Option<&Value> {
        self.result.as_deref()
    }
}
