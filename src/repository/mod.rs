//! Repository layer: typed CRUD over the document store.
//!
//! Nothing here maintains the book/member relationship; that is the
//! lending service's job.

pub mod books;
pub mod librarians;
pub mod members;

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{BookWithBorrower, Member, MemberSummary, MemberWithBooks},
    store::{Document, DocumentStore},
};

/// Main repository struct holding the document store
#[derive(Clone)]
pub struct Repository {
    pub store: Arc<dyn DocumentStore>,
    pub books: books::BooksRepository,
    pub members: members::MembersRepository,
    pub librarians: librarians::LibrariansRepository,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            books: books::BooksRepository::new(store.clone()),
            members: members::MembersRepository::new(store.clone()),
            librarians: librarians::LibrariansRepository::new(store.clone()),
            store,
        }
    }

    /// All books, each with its borrower's visible fields
    pub async fn list_books_with_borrowers(&self) -> AppResult<Vec<BookWithBorrower>> {
        let books = self.books.list().await?;
        let members: HashMap<_, _> = self
            .members
            .list()
            .await?
            .iter()
            .map(|member| (member.id, MemberSummary::from(member)))
            .collect();

        Ok(books
            .into_iter()
            .map(|book| {
                let borrower = book.status.borrower().and_then(|id| members.get(&id).cloned());
                BookWithBorrower::new(book, borrower)
            })
            .collect())
    }

    /// All members, each with borrowed books resolved in borrow order
    pub async fn list_members_with_books(&self) -> AppResult<Vec<MemberWithBooks>> {
        let books: HashMap<_, _> = self
            .books
            .list()
            .await?
            .into_iter()
            .map(|book| (book.id, book))
            .collect();

        Ok(self
            .members
            .list()
            .await?
            .into_iter()
            .map(|member| resolve_books(member, |id| books.get(&id).cloned()))
            .collect())
    }

    /// A single member with borrowed books resolved
    pub async fn member_with_books(&self, member: Member) -> AppResult<MemberWithBooks> {
        let mut books = HashMap::new();
        for id in &member.books {
            if let Some(book) = self.books.find_by_id(*id).await? {
                books.insert(*id, book);
            }
        }
        Ok(resolve_books(member, |id| books.remove(&id)))
    }
}

/// References to books that no longer exist are dropped
fn resolve_books<F>(member: Member, mut lookup: F) -> MemberWithBooks
where
    F: FnMut(uuid::Uuid) -> Option<crate::models::Book>,
{
    MemberWithBooks {
        id: member.id,
        name: member.name,
        username: member.username,
        books: member.books.iter().filter_map(|id| lookup(*id)).collect(),
    }
}

/// Decode a stored document into a model, injecting its id
pub(crate) fn decode<T: DeserializeOwned>(doc: Document) -> AppResult<T> {
    let Document { id, mut body } = doc;
    if let Value::Object(ref mut fields) = body {
        fields.insert("id".to_string(), json!(id));
    }
    Ok(serde_json::from_value(body)?)
}

pub(crate) fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> AppResult<Vec<T>> {
    docs.into_iter().map(decode).collect()
}
