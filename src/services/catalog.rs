//! Catalog management service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput, BookQuery},
    repository::BookStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn BookStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// List books, filtered by title when `search` is set
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        match query.search.as_deref() {
            Some(needle) if !needle.is_empty() => self.store.search(needle).await,
            _ => self.store.list().await,
        }
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::book_not_found(id))
    }

    pub async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        let book = self.store.create(&input).await?;
        tracing::info!(book_id = book.id, title = %book.title, "Book added to catalog");
        Ok(book)
    }

    /// Replace title/author/isbn; availability is left to the lending service
    pub async fn update_book(&self, id: i64, input: BookInput) -> AppResult<Book> {
        let book = self.store.update(id, &input).await?;
        tracing::info!(book_id = id, "Book updated");
        Ok(book)
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        self.store.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    pub async fn count_books(&self) -> AppResult<i64> {
        self.store.count().await
    }
}
