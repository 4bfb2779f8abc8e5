use serde_json::Value;

use super::context::{EntityId, Params};
use super::error::ServiceError;

/// A CRUD service whose calls run between before and after hook chains.
pub trait Service: Send + Sync {
    fn find(&self, params: &Params) -> Result<Value, ServiceError>;

    fn get(&self, id: &EntityId, params: &Params) -> Result<Value, ServiceError>;

    fn create(&self, data: Value, params: &Params) -> Result<Value, ServiceError>;

    /// Replace the record with `data`.
    fn update(&self, id: &EntityId, data: Value, params: &Params) -> Result<Value, ServiceError>;

    /// Merge `data` into the record.
    fn patch(&self, id: &EntityId, data: Value, params: &Params) -> Result<Value, ServiceError>;

    fn remove(&self, id: &EntityId, params: &Params) -> Result<Value, ServiceError>;
}
