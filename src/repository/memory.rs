//! In-process book store (not durable)

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput},
};

use super::BookStore;

#[derive(Default)]
struct Shelf {
    books: BTreeMap<i64, Book>,
    /// Last id handed out; ids are never reused after delete
    last_id: i64,
}

#[derive(Default)]
pub struct InMemoryBookStore {
    shelf: RwLock<Shelf>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        input.validate()?;

        let mut shelf = self.shelf.write().await;
        shelf.last_id += 1;
        let book = Book {
            id: shelf.last_id,
            title: input.title.clone(),
            author: input.author.clone(),
            isbn: input.isbn.clone(),
            available: true,
        };
        shelf.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn get(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.shelf.read().await.books.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.shelf.read().await.books.values().cloned().collect())
    }

    async fn search(&self, needle: &str) -> AppResult<Vec<Book>> {
        Ok(self
            .shelf
            .read()
            .await
            .books
            .values()
            .filter(|b| b.title_contains(needle))
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, input: &BookInput) -> AppResult<Book> {
        input.validate()?;

        let mut shelf = self.shelf.write().await;
        let book = shelf
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::book_not_found(id))?;
        book.title = input.title.clone();
        book.author = input.author.clone();
        book.isbn = input.isbn.clone();
        Ok(book.clone())
    }

    async fn set_available(&self, id: i64, available: bool) -> AppResult<Book> {
        let mut shelf = self.shelf.write().await;
        let book = shelf
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::book_not_found(id))?;
        book.available = available;
        Ok(book.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.shelf.write().await.books.remove(&id);
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.shelf.read().await.books.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_fresh_ids() {
        let store = InMemoryBookStore::new();
        let a = store.create(&BookInput::new("A")).await.unwrap();
        let b = store.create(&BookInput::new("B")).await.unwrap();
        assert_ne!(a.id, b.id);

        store.delete(b.id).await.unwrap();
        let c = store.create(&BookInput::new("C")).await.unwrap();
        assert!(c.id > b.id);
    }

    #[tokio::test]
    async fn test_search_matches_substring_ignoring_case() {
        let store = InMemoryBookStore::new();
        store.create(&BookInput::new("Clean Code")).await.unwrap();
        store.create(&BookInput::new("Dune")).await.unwrap();

        let found = store.search("CODE").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Clean Code");
        assert_eq!(store.search("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_round_trip() {
        let store = InMemoryBookStore::new();
        let book = store.create(&BookInput::new("Dune")).await.unwrap();
        let input = BookInput::new("Children of Dune").author("Herbert").isbn("0003");

        store.update(book.id, &input).await.unwrap();

        let fetched = store.get(book.id).await.unwrap().unwrap();
        assert_eq!(BookInput::from(&fetched), input);
        assert!(fetched.available);
    }

    #[tokio::test]
    async fn test_blank_update_rejected() {
        let store = InMemoryBookStore::new();
        let book = store.create(&BookInput::new("Dune")).await.unwrap();
        assert!(matches!(
            store.update(book.id, &BookInput::new(" ")).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(store.get(book.id).await.unwrap().unwrap().title, "Dune");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryBookStore::new();
        let book = store.create(&BookInput::new("Dune")).await.unwrap();
        store.delete(book.id).await.unwrap();
        store.delete(book.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_titles() {
        let store = InMemoryBookStore::new();
        store.create(&BookInput::new("ÉCOLE DES FEMMES")).await.unwrap();
        store.create(&BookInput::new("Über Alles")).await.unwrap();

        assert_eq!(store.search("école").await.unwrap().len(), 1);
        assert_eq!(store.search("über").await.unwrap().len(), 1);
    }
}
