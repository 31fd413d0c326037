//! Librarians repository

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::decode;
use crate::{
    error::{AppError, AppResult},
    models::{identity::SignupRequest, Librarian},
    store::{Collection, DocumentStore},
};

#[derive(Clone)]
pub struct LibrariansRepository {
    store: Arc<dyn DocumentStore>,
}

impl LibrariansRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Librarian>> {
        self.store
            .find_by_id(Collection::Librarians, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Get librarian by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Librarian> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Librarian not found".to_string()))
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<Librarian>> {
        self.store
            .find_by_field(Collection::Librarians, "username", &json!(username))
            .await?
            .into_iter()
            .next()
            .map(decode)
            .transpose()
    }

    /// Insert a new librarian with an already hashed password
    pub async fn create(&self, signup: &SignupRequest, password_hash: &str) -> AppResult<Librarian> {
        signup.validate()?;

        let id = self
            .store
            .insert(
                Collection::Librarians,
                json!({
                    "name": signup.name,
                    "username": signup.username,
                    "password": password_hash,
                }),
            )
            .await?;

        self.get_by_id(id).await
    }
}
