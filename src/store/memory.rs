//! In-memory document store.
//!
//! Used by the test suite and by `database.backend = "memory"` for local
//! development. State lives for the lifetime of the process only.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Fields, Mutation};
use crate::error::{AppError, AppResult};

type Collections = HashMap<Collection, IndexMap<Uuid, Value>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

fn poison_err<T>(_: PoisonError<T>) -> AppError {
    AppError::Storage("lock poisoned".to_string())
}

/// Every expected field holds the given value; absent fields read as null
fn matches(object: &Fields, expect: &Fields) -> bool {
    expect
        .iter()
        .all(|(field, value)| object.get(field).unwrap_or(&Value::Null) == value)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in a collection
    #[cfg(test)]
    pub fn count(&self, collection: Collection) -> AppResult<usize> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections.get(&collection).map_or(0, IndexMap::len))
    }
}

fn apply(body: &mut Value, mutation: &Mutation) -> AppResult<bool> {
    let object = body
        .as_object_mut()
        .ok_or_else(|| AppError::Storage("document is not an object".to_string()))?;

    match mutation {
        Mutation::Set { fields, expect } => {
            if !matches(object, expect) {
                return Ok(false);
            }
            for (field, value) in fields {
                object.insert(field.clone(), value.clone());
            }
            Ok(true)
        }
        Mutation::Push { field, value } => {
            let entry = object
                .entry(field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let array = entry
                .as_array_mut()
                .ok_or_else(|| AppError::Storage(format!("field {} is not an array", field)))?;
            array.push(value.clone());
            Ok(true)
        }
        Mutation::Pull { field, value } => {
            let Some(array) = object.get_mut(field).and_then(Value::as_array_mut) else {
                return Ok(false);
            };
            match array.iter().position(|item| item == value) {
                Some(index) => {
                    array.remove(index);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_id(&self, collection: Collection, id: Uuid) -> AppResult<Option<Document>> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(&id))
            .map(|body| Document {
                id,
                body: body.clone(),
            }))
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<Document>> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, body)| body.get(field) == Some(value))
                    .map(|(id, body)| Document {
                        id: *id,
                        body: body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_all(&self, collection: Collection) -> AppResult<Vec<Document>> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, body)| Document {
                        id: *id,
                        body: body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: Collection, body: Value) -> AppResult<Uuid> {
        if !body.is_object() {
            return Err(AppError::Storage("document is not an object".to_string()));
        }

        let mut collections = self.collections.write().map_err(poison_err)?;
        let docs = collections.entry(collection).or_default();

        // Same rule as the unique username index of the Postgres backend
        if let Some(username) = body.get("username") {
            if docs.values().any(|doc| doc.get("username") == Some(username)) {
                return Err(AppError::Conflict("Username already registered".to_string()));
            }
        }

        let id = Uuid::new_v4();
        docs.insert(id, body);
        Ok(id)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        mutation: &Mutation,
    ) -> AppResult<bool> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        let Some(body) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(&id))
        else {
            return Ok(false);
        };
        apply(body, mutation)
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid, expect: &Fields) -> AppResult<bool> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        match docs.get(&id) {
            Some(body) if body.as_object().is_some_and(|object| matches(object, expect)) => {
                docs.shift_remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> AppResult<()> {
        drop(self.collections.read().map_err(poison_err)?);
        Ok(())
    }
}
