//! Member model and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::book::Book;

/// Member model from the document store
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(rename = "password", skip_serializing)]
    pub password_hash: String,
    /// Borrowed book ids, in borrow order
    #[serde(default)]
    pub books: Vec<Uuid>,
}

impl Member {
    pub fn holds(&self, book_id: Uuid) -> bool {
        self.books.contains(&book_id)
    }
}

/// Visible member fields, used when a member is shown next to a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            username: member.username.clone(),
        }
    }
}

/// Member with borrowed books resolved to full records
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberWithBooks {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub books: Vec<Book>,
}
