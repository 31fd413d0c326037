//! Members repository

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::{decode, decode_all};
use crate::{
    error::{AppError, AppResult},
    models::{identity::SignupRequest, Member},
    store::{Collection, DocumentStore, Fields, Mutation},
};

const BOOKS: &str = "books";

#[derive(Clone)]
pub struct MembersRepository {
    store: Arc<dyn DocumentStore>,
}

impl MembersRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Member>> {
        self.store
            .find_by_id(Collection::Members, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Member> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<Member>> {
        self.store
            .find_by_field(Collection::Members, "username", &json!(username))
            .await?
            .into_iter()
            .next()
            .map(decode)
            .transpose()
    }

    pub async fn list(&self) -> AppResult<Vec<Member>> {
        decode_all(self.store.find_all(Collection::Members).await?)
    }

    /// Insert a new member with an already hashed password
    pub async fn create(&self, signup: &SignupRequest, password_hash: &str) -> AppResult<Member> {
        signup.validate()?;

        let id = self
            .store
            .insert(
                Collection::Members,
                json!({
                    "name": signup.name,
                    "username": signup.username,
                    "password": password_hash,
                    "books": [],
                }),
            )
            .await?;

        self.get_by_id(id).await
    }

    /// Append a book id to the member's list. `false` if the member is gone.
    pub async fn push_book(&self, member_id: Uuid, book_id: Uuid) -> AppResult<bool> {
        self.store
            .update_by_id(Collection::Members, member_id, &Mutation::push(BOOKS, json!(book_id)))
            .await
    }

    /// Remove one exact occurrence of a book id. `false` if it was not listed.
    pub async fn pull_book(&self, member_id: Uuid, book_id: Uuid) -> AppResult<bool> {
        self.store
            .update_by_id(Collection::Members, member_id, &Mutation::pull(BOOKS, json!(book_id)))
            .await
    }

    /// Replace the member's whole book list
    pub async fn set_books(&self, member_id: Uuid, books: &[Uuid]) -> AppResult<bool> {
        let mut fields = Fields::new();
        fields.insert(BOOKS.to_string(), json!(books));
        self.store
            .update_by_id(Collection::Members, member_id, &Mutation::set_all(fields))
            .await
    }

    pub async fn delete(&self, member_id: Uuid) -> AppResult<bool> {
        self.store
            .delete_by_id(Collection::Members, member_id, &Fields::new())
            .await
    }
}
