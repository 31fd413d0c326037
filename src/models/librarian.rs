//! Librarian model

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Librarian model from the document store
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Librarian {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(rename = "password", skip_serializing)]
    pub password_hash: String,
}
