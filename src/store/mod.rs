//! Document store interface.
//!
//! Records are JSON objects grouped in collections and keyed by a
//! store-generated UUID. Every call is atomic for the record it touches;
//! nothing here is atomic across records. Conditional writes (`expect`)
//! are the building block for the lending protocol's compare-and-swap.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppResult;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Top-level document fields
pub type Fields = Map<String, Value>;

/// Document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Librarians,
    Members,
    Books,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Librarians => "librarians",
            Collection::Members => "members",
            Collection::Books => "books",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored record: its id plus the JSON body (which never holds the id)
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub body: Value,
}

/// A single-record update
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Merge `fields` into the document when every `expect` field currently
    /// holds the given value (a missing field compares as `null`).
    Set { fields: Fields, expect: Fields },
    /// Append `value` to the array `field`, creating it when absent
    Push { field: String, value: Value },
    /// Remove the first element of the array `field` equal to `value`
    Pull { field: String, value: Value },
}

impl Mutation {
    pub fn set(field: &str, value: Value) -> Self {
        let mut fields = Fields::new();
        fields.insert(field.to_string(), value);
        Mutation::Set {
            fields,
            expect: Fields::new(),
        }
    }

    pub fn set_all(fields: Fields) -> Self {
        Mutation::Set {
            fields,
            expect: Fields::new(),
        }
    }

    /// Adds a precondition to a `Set`; other mutations are returned unchanged
    pub fn expecting(mut self, field: &str, value: Value) -> Self {
        if let Mutation::Set { ref mut expect, .. } = self {
            expect.insert(field.to_string(), value);
        }
        self
    }

    pub fn push(field: &str, value: Value) -> Self {
        Mutation::Push {
            field: field.to_string(),
            value,
        }
    }

    pub fn pull(field: &str, value: Value) -> Self {
        Mutation::Pull {
            field: field.to_string(),
            value,
        }
    }
}

/// Builds a one-field precondition for conditional deletes
pub fn expect_field(field: &str, value: Value) -> Fields {
    let mut expect = Fields::new();
    expect.insert(field.to_string(), value);
    expect
}

/// Persistence backend consumed by the repositories.
///
/// `update_by_id` and `delete_by_id` return `false` when no record matched
/// the id and preconditions; storage failures are `AppError::Storage`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_id(&self, collection: Collection, id: Uuid) -> AppResult<Option<Document>>;

    /// Documents whose top-level `field` equals `value`, in insertion order
    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<Document>>;

    /// All documents of a collection, in insertion order
    async fn find_all(&self, collection: Collection) -> AppResult<Vec<Document>>;

    async fn insert(&self, collection: Collection, body: Value) -> AppResult<Uuid>;

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        mutation: &Mutation,
    ) -> AppResult<bool>;

    async fn delete_by_id(&self, collection: Collection, id: Uuid, expect: &Fields)
        -> AppResult<bool>;

    /// Connectivity check
    async fn ping(&self) -> AppResult<()>;
}
