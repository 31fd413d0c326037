//! Books repository

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::{decode, decode_all};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookStatus, BookUpdate, NewBook},
    store::{expect_field, Collection, DocumentStore, Fields, Mutation},
};

#[derive(Clone)]
pub struct BooksRepository {
    store: Arc<dyn DocumentStore>,
}

impl BooksRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        self.store
            .find_by_id(Collection::Books, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    pub async fn list(&self) -> AppResult<Vec<Book>> {
        decode_all(self.store.find_all(Collection::Books).await?)
    }

    /// Books whose status names `member_id` as borrower
    pub async fn list_borrowed_by(&self, member_id: Uuid) -> AppResult<Vec<Book>> {
        let status = BookStatus::borrowed_by(member_id).to_value();
        decode_all(
            self.store
                .find_by_field(Collection::Books, "status", &status)
                .await?,
        )
    }

    /// Add a book to the catalog; new books are always available
    pub async fn create(&self, book: &NewBook) -> AppResult<Book> {
        book.validate()?;

        let id = self
            .store
            .insert(
                Collection::Books,
                json!({
                    "title": book.title,
                    "author": book.author,
                    "description": book.description,
                    "image": book.image,
                    "status": BookStatus::Available.to_value(),
                }),
            )
            .await?;

        self.get_by_id(id).await
    }

    /// Edit descriptive fields of a book
    pub async fn update(&self, id: Uuid, update: &BookUpdate) -> AppResult<Book> {
        update.validate()?;
        if update.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        let mut fields = Fields::new();
        if let Some(ref title) = update.title {
            fields.insert("title".to_string(), json!(title));
        }
        if let Some(ref author) = update.author {
            fields.insert("author".to_string(), json!(author));
        }
        if let Some(ref description) = update.description {
            fields.insert("description".to_string(), json!(description));
        }
        if let Some(ref image) = update.image {
            fields.insert("image".to_string(), json!(image));
        }

        let updated = self
            .store
            .update_by_id(Collection::Books, id, &Mutation::set_all(fields))
            .await?;
        if !updated {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        self.get_by_id(id).await
    }

    /// Compare-and-swap on the lending status.
    /// Returns `false` when the book is missing or its status is not `from`.
    pub async fn set_status(&self, id: Uuid, from: BookStatus, to: BookStatus) -> AppResult<bool> {
        let mutation = Mutation::set("status", to.to_value()).expecting("status", from.to_value());
        self.store.update_by_id(Collection::Books, id, &mutation).await
    }

    /// Delete a book if its status is still `expected`
    pub async fn delete(&self, id: Uuid, expected: BookStatus) -> AppResult<bool> {
        self.store
            .delete_by_id(Collection::Books, id, &expect_field("status", expected.to_value()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn repo() -> BooksRepository {
        BooksRepository::new(Arc::new(MemoryStore::new()))
    }

    fn dune() -> NewBook {
        NewBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            description: "Desert planet".to_string(),
            image: Some("dune.jpg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_book_starts_available() {
        let books = repo();
        let book = books.create(&dune()).await.unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.status, BookStatus::Available);
    }

    #[tokio::test]
    async fn test_create_book_rejects_missing_title() {
        let books = repo();
        let err = books
            .create(&NewBook {
                title: String::new(),
                ..dune()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Title is required"));
    }

    #[tokio::test]
    async fn test_update_book_keeps_status() {
        let books = repo();
        let book = books.create(&dune()).await.unwrap();
        let member = Uuid::new_v4();
        books
            .set_status(book.id, BookStatus::Available, BookStatus::borrowed_by(member))
            .await
            .unwrap();

        let update = BookUpdate {
            description: Some("Spice".to_string()),
            ..Default::default()
        };
        let updated = books.update(book.id, &update).await.unwrap();
        assert_eq!(updated.description, "Spice");
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.status, BookStatus::borrowed_by(member));
    }

    #[tokio::test]
    async fn test_update_missing_book_is_not_found() {
        let books = repo();
        let update = BookUpdate {
            title: Some("Ghost".to_string()),
            ..Default::default()
        };
        let err = books.update(Uuid::new_v4(), &update).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_status_is_compare_and_swap() {
        let books = repo();
        let book = books.create(&dune()).await.unwrap();
        let (m1, m2) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(books.set_status(book.id, BookStatus::Available, BookStatus::borrowed_by(m1)).await.unwrap());
        assert!(!books.set_status(book.id, BookStatus::Available, BookStatus::borrowed_by(m2)).await.unwrap());
        assert_eq!(books.list_borrowed_by(m1).await.unwrap().len(), 1);
        assert!(books.list_borrowed_by(m2).await.unwrap().is_empty());
    }
}
