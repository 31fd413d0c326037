//! Lending: borrow, return and the deletions that must reconcile both
//! sides of the book/member relationship.
//!
//! A book id is listed in `Member.books` exactly when the book's status
//! names that member as borrower. The store is atomic per record only, so
//! every operation is an ordered sequence of single-record writes. The side
//! that blocks other members is written first (the book on borrow, the
//! member list on return), and each completed write records its inverse in
//! an [`UndoLog`] that is replayed newest-first if a later write fails.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookStatus, Member},
    repository::Repository,
};

/// Attempts for a book deletion whose guard keeps missing
const DELETE_BOOK_ATTEMPTS: usize = 3;

/// Inverse of a completed write
#[derive(Debug, Clone, PartialEq)]
enum Compensation {
    /// Put a claimed book back on the shelf
    Release { book_id: Uuid, member_id: Uuid },
    /// Give a released book back to its borrower
    Reclaim { book_id: Uuid, member_id: Uuid },
    /// Re-list a pulled book id, if the book is still borrowed by the member
    PushBack { member_id: Uuid, book_id: Uuid },
    /// Restore a member's list, keeping ids still borrowed by the member
    RestoreBooks { member_id: Uuid, books: Vec<Uuid> },
}

struct UndoLog<'a> {
    repository: &'a Repository,
    operation: &'static str,
    steps: Vec<Compensation>,
}

impl<'a> UndoLog<'a> {
    fn new(repository: &'a Repository, operation: &'static str) -> Self {
        Self {
            repository,
            operation,
            steps: Vec::new(),
        }
    }

    fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    /// Roll back and return `err`
    async fn fail<T>(self, err: AppError) -> AppResult<T> {
        tracing::warn!(operation = self.operation, error = %err, "Rolling back partial write");
        self.rollback().await;
        Err(err)
    }

    async fn rollback(self) {
        for step in self.steps.iter().rev() {
            match self.compensate(step).await {
                Ok(true) => {
                    tracing::info!(operation = self.operation, ?step, "Compensation applied")
                }
                Ok(false) => {
                    tracing::warn!(operation = self.operation, ?step, "Compensation skipped, state moved on")
                }
                Err(e) => {
                    tracing::error!(operation = self.operation, ?step, error = %e, "Compensation failed")
                }
            }
        }
    }

    async fn compensate(&self, step: &Compensation) -> AppResult<bool> {
        let repo = self.repository;
        match step {
            Compensation::Release { book_id, member_id } => {
                repo.books
                    .set_status(*book_id, BookStatus::borrowed_by(*member_id), BookStatus::Available)
                    .await
            }
            Compensation::Reclaim { book_id, member_id } => {
                repo.books
                    .set_status(*book_id, BookStatus::Available, BookStatus::borrowed_by(*member_id))
                    .await
            }
            Compensation::PushBack { member_id, book_id } => {
                if !is_borrowed_by(repo, *book_id, *member_id).await? {
                    return Ok(false);
                }
                repo.members.push_book(*member_id, *book_id).await
            }
            Compensation::RestoreBooks { member_id, books } => {
                let mut kept = Vec::with_capacity(books.len());
                for book_id in books {
                    if is_borrowed_by(repo, *book_id, *member_id).await? {
                        kept.push(*book_id);
                    }
                }
                repo.members.set_books(*member_id, &kept).await
            }
        }
    }
}

async fn is_borrowed_by(repo: &Repository, book_id: Uuid, member_id: Uuid) -> AppResult<bool> {
    Ok(repo
        .books
        .find_by_id(book_id)
        .await?
        .is_some_and(|book| book.status.borrower() == Some(member_id)))
}

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
}

impl LendingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Lend a book to a member.
    ///
    /// The book is claimed with a conditional write, so of several
    /// concurrent borrowers exactly one succeeds.
    pub async fn borrow(&self, member_id: Uuid, book_id: Uuid) -> AppResult<Book> {
        let repo = &self.repository;
        repo.members.get_by_id(member_id).await?;
        let book = repo.books.get_by_id(book_id).await?;

        if !book.status.is_available() {
            tracing::warn!(%member_id, %book_id, "Borrow refused, book not available");
            return Err(AppError::BookUnavailable);
        }

        let borrowed = BookStatus::borrowed_by(member_id);
        if !repo.books.set_status(book_id, BookStatus::Available, borrowed).await? {
            // Lost the race, or the book was deleted in between
            return match repo.books.find_by_id(book_id).await? {
                Some(_) => {
                    tracing::warn!(%member_id, %book_id, "Borrow refused, book claimed concurrently");
                    Err(AppError::BookUnavailable)
                }
                None => Err(AppError::NotFound("Book not found".to_string())),
            };
        }

        let mut undo = UndoLog::new(repo, "borrow");
        undo.record(Compensation::Release { book_id, member_id });

        match repo.members.push_book(member_id, book_id).await {
            Ok(true) => {}
            Ok(false) => return undo.fail(AppError::NotFound("Member not found".to_string())).await,
            Err(e) => return undo.fail(e).await,
        }

        tracing::info!(%member_id, %book_id, "Book borrowed");
        Ok(Book {
            status: borrowed,
            ..book
        })
    }

    /// Take a book back from the member holding it
    pub async fn return_book(&self, member_id: Uuid, book_id: Uuid) -> AppResult<Book> {
        let repo = &self.repository;
        repo.members.get_by_id(member_id).await?;
        let book = repo.books.get_by_id(book_id).await?;

        if book.status.borrower() != Some(member_id) {
            tracing::warn!(%member_id, %book_id, "Return refused, book not held by member");
            return Err(AppError::NotBorrowed);
        }

        let mut undo = UndoLog::new(repo, "return");

        if repo.members.pull_book(member_id, book_id).await? {
            undo.record(Compensation::PushBack { member_id, book_id });
        } else {
            tracing::warn!(%member_id, %book_id, "Borrowed book missing from member list, repairing");
        }

        match repo
            .books
            .set_status(book_id, BookStatus::borrowed_by(member_id), BookStatus::Available)
            .await
        {
            Ok(true) => {}
            // Returned or deleted concurrently
            Ok(false) => return undo.fail(AppError::NotBorrowed).await,
            Err(e) => return undo.fail(e).await,
        }

        tracing::info!(%member_id, %book_id, "Book returned");
        Ok(Book {
            status: BookStatus::Available,
            ..book
        })
    }

    /// Release every book the member holds and empty the member's list.
    /// Returns the ids of the released books.
    pub async fn return_all(&self, member_id: Uuid) -> AppResult<Vec<Uuid>> {
        let member = self.repository.members.get_by_id(member_id).await?;
        let mut undo = UndoLog::new(&self.repository, "return_all");

        match self.release_all(&member, &mut undo).await {
            Ok(released) => Ok(released),
            Err(e) => undo.fail(e).await,
        }
    }

    async fn release_all(&self, member: &Member, undo: &mut UndoLog<'_>) -> AppResult<Vec<Uuid>> {
        let repo = &self.repository;
        let member_id = member.id;

        // Books naming this member but missing from the list are released too
        let mut held = member.books.clone();
        for book in repo.books.list_borrowed_by(member_id).await? {
            if !member.holds(book.id) {
                tracing::warn!(%member_id, book_id = %book.id, "Borrowed book missing from member list, repairing");
                held.push(book.id);
            }
        }

        if !repo.members.set_books(member_id, &[]).await? {
            return Err(AppError::NotFound("Member not found".to_string()));
        }
        undo.record(Compensation::RestoreBooks {
            member_id,
            books: member.books.clone(),
        });

        let mut released = Vec::with_capacity(held.len());
        for book_id in held {
            if repo
                .books
                .set_status(book_id, BookStatus::borrowed_by(member_id), BookStatus::Available)
                .await?
            {
                undo.record(Compensation::Reclaim { book_id, member_id });
                released.push(book_id);
            } else {
                tracing::warn!(%member_id, %book_id, "Listed book not borrowed by member, skipping");
            }
        }

        tracing::info!(%member_id, count = released.len(), "Released all borrowed books");
        Ok(released)
    }

    /// Remove a book, detaching it from its borrower first
    pub async fn delete_book(&self, book_id: Uuid) -> AppResult<()> {
        let repo = &self.repository;

        for attempt in 1..=DELETE_BOOK_ATTEMPTS {
            let book = repo.books.get_by_id(book_id).await?;
            let mut undo = UndoLog::new(repo, "delete_book");

            if let Some(member_id) = book.status.borrower() {
                if repo.members.pull_book(member_id, book_id).await? {
                    undo.record(Compensation::PushBack { member_id, book_id });
                } else {
                    tracing::warn!(%member_id, %book_id, "Borrower does not list deleted book");
                }
            }

            // Guarded by the status seen above, so a concurrent borrow or
            // return cannot leave a dangling reference behind
            match repo.books.delete(book_id, book.status).await {
                Ok(true) => {
                    tracing::info!(%book_id, "Book deleted");
                    return Ok(());
                }
                Ok(false) => {
                    tracing::debug!(%book_id, attempt, "Book changed during delete, retrying");
                    undo.rollback().await;
                }
                Err(e) => return undo.fail(e).await,
            }
        }

        Err(AppError::Conflict("Book is being modified, try again".to_string()))
    }

    /// Remove a member after releasing every book they hold
    pub async fn delete_member(&self, member_id: Uuid) -> AppResult<()> {
        let repo = &self.repository;
        let member = repo.members.get_by_id(member_id).await?;
        let mut undo = UndoLog::new(repo, "delete_member");

        if let Err(e) = self.release_all(&member, &mut undo).await {
            return undo.fail(e).await;
        }

        match repo.members.delete(member_id).await {
            Ok(true) => {}
            // Deleted concurrently; the released books are consistent either way
            Ok(false) => return Err(AppError::NotFound("Member not found".to_string())),
            Err(e) => return undo.fail(e).await,
        }

        // The member is gone; a failed sweep leaves at most a stray claim
        if let Err(e) = self.release_stragglers(member_id).await {
            tracing::error!(%member_id, error = %e, "Sweep after member deletion failed");
        }

        tracing::info!(%member_id, "Member deleted");
        Ok(())
    }

    /// Release books a racing borrow claimed after the member list was emptied
    async fn release_stragglers(&self, member_id: Uuid) -> AppResult<()> {
        let repo = &self.repository;
        for book in repo.books.list_borrowed_by(member_id).await? {
            if repo
                .books
                .set_status(book.id, BookStatus::borrowed_by(member_id), BookStatus::Available)
                .await?
            {
                tracing::warn!(%member_id, book_id = %book.id, "Released book claimed during member deletion");
            }
        }
        Ok(())
    }
}
