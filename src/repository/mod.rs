//! Repository layer: book record storage
//!
//! Stores are plain CRUD + search. They give no atomicity across calls;
//! anything that needs check-then-write on a book (borrow/return) goes through
//! [`crate::services::lending::LendingService`].

pub mod books;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::DatabaseConfig,
    error::AppResult,
    models::book::{Book, BookInput},
};

pub use books::SqliteBookStore;
pub use memory::InMemoryBookStore;

/// Storage contract shared by every book store implementation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a new book and return it with its assigned id. New books are available.
    async fn create(&self, input: &BookInput) -> AppResult<Book>;

    /// Get a book by id, `None` if absent
    async fn get(&self, id: i64) -> AppResult<Option<Book>>;

    /// All books, ordered by id
    async fn list(&self) -> AppResult<Vec<Book>>;

    /// Books whose title contains `needle`, case-insensitive, ordered by id
    async fn search(&self, needle: &str) -> AppResult<Vec<Book>>;

    /// Replace title, author and isbn. Fails with `NotFound` for a missing id.
    async fn update(&self, id: i64, input: &BookInput) -> AppResult<Book>;

    /// Persist the availability flag. Only the lending service calls this.
    async fn set_available(&self, id: i64, available: bool) -> AppResult<Book>;

    /// Delete a book. Deleting a missing id is not an error.
    async fn delete(&self, id: i64) -> AppResult<()>;

    /// Number of stored books
    async fn count(&self) -> AppResult<i64>;

    /// Release underlying resources on shutdown
    async fn close(&self) {}
}

/// Open the store selected by `database.url`
pub async fn connect(config: &DatabaseConfig) -> AppResult<Arc<dyn BookStore>> {
    if config.is_memory() {
        tracing::info!("Using in-memory book store");
        return Ok(Arc::new(InMemoryBookStore::new()));
    }

    let store = SqliteBookStore::connect(&config.url, config.max_connections).await?;
    tracing::info!(url = %config.url, "Connected to sqlite book store");
    Ok(Arc::new(store))
}
