//! Book model and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::member::MemberSummary;

/// Lending state of a book.
///
/// A book is either on the shelf or held by exactly one member, so the
/// `available`/`borrower` pair of the stored document can never disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BookStatusDoc", into = "BookStatusDoc")]
pub enum BookStatus {
    #[default]
    Available,
    Borrowed { borrower: Uuid },
}

impl BookStatus {
    pub fn borrowed_by(member_id: Uuid) -> Self {
        BookStatus::Borrowed { borrower: member_id }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, BookStatus::Available)
    }

    pub fn borrower(&self) -> Option<Uuid> {
        match self {
            BookStatus::Available => None,
            BookStatus::Borrowed { borrower } => Some(*borrower),
        }
    }

    /// Stored JSON form, used as the expected value in conditional writes
    pub fn to_value(self) -> serde_json::Value {
        serde_json::json!(BookStatusDoc::from(self))
    }
}

/// Stored shape of [`BookStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookStatusDoc {
    pub available: bool,
    pub borrower: Option<Uuid>,
}

impl From<BookStatus> for BookStatusDoc {
    fn from(status: BookStatus) -> Self {
        Self {
            available: status.is_available(),
            borrower: status.borrower(),
        }
    }
}

impl TryFrom<BookStatusDoc> for BookStatus {
    type Error = String;

    fn try_from(doc: BookStatusDoc) -> Result<Self, Self::Error> {
        match (doc.available, doc.borrower) {
            (true, None) => Ok(BookStatus::Available),
            (false, Some(borrower)) => Ok(BookStatus::Borrowed { borrower }),
            (true, Some(_)) => Err("available book must not have a borrower".to_string()),
            (false, None) => Err("unavailable book must have a borrower".to_string()),
        }
    }
}

/// Book model from the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub image: Option<String>,
    #[schema(value_type = BookStatusDoc)]
    #[serde(default)]
    pub status: BookStatus,
}

/// Book with its borrower resolved, for catalog listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookWithBorrower {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub image: Option<String>,
    pub available: bool,
    pub borrower: Option<MemberSummary>,
}

impl BookWithBorrower {
    pub fn new(book: Book, borrower: Option<MemberSummary>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            description: book.description,
            image: book.image,
            available: book.status.is_available(),
            borrower,
        }
    }
}

/// Add book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub image: Option<String>,
}

/// Edit book request. Lending status is not editable here.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BookUpdate {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: Option<String>,
    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: Option<String>,
    pub image: Option<String>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.description.is_none()
            && self.image.is_none()
    }
}
