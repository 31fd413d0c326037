//! Catalog reads and librarian book edits

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Book, BookUpdate, BookWithBorrower, Librarian, MemberSummary, MemberWithBooks, NewBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Librarian view: every book with its borrower
    pub async fn list_books(&self) -> AppResult<Vec<BookWithBorrower>> {
        self.repository.list_books_with_borrowers().await
    }

    /// Member view: borrowers other than the caller are hidden
    pub async fn list_books_for_member(&self, member_id: Uuid) -> AppResult<Vec<BookWithBorrower>> {
        let me = self.repository.members.get_by_id(member_id).await?;
        let summary = MemberSummary::from(&me);

        Ok(self
            .repository
            .books
            .list()
            .await?
            .into_iter()
            .map(|book| {
                let borrower = (book.status.borrower() == Some(member_id)).then(|| summary.clone());
                BookWithBorrower::new(book, borrower)
            })
            .collect())
    }

    pub async fn list_members(&self) -> AppResult<Vec<MemberWithBooks>> {
        self.repository.list_members_with_books().await
    }

    pub async fn add_book(&self, book: &NewBook) -> AppResult<Book> {
        let book = self.repository.books.create(book).await?;
        tracing::info!(book_id = %book.id, title = %book.title, "Book added");
        Ok(book)
    }

    pub async fn update_book(&self, id: Uuid, update: &BookUpdate) -> AppResult<Book> {
        let book = self.repository.books.update(id, update).await?;
        tracing::info!(book_id = %id, "Book updated");
        Ok(book)
    }

    /// A member with borrowed books resolved in borrow order
    pub async fn member_profile(&self, member_id: Uuid) -> AppResult<MemberWithBooks> {
        let member = self.repository.members.get_by_id(member_id).await?;
        self.repository.member_with_books(member).await
    }

    pub async fn librarian_profile(&self, librarian_id: Uuid) -> AppResult<Librarian> {
        self.repository.librarians.get_by_id(librarian_id).await
    }

    /// Check the document store is reachable
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.store.ping().await
    }
}
