//! Single-file sqlite book store

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput},
};

use super::BookStore;

const BOOK_COLUMNS: &str = "id, title, author, isbn, available";

// Writes read their `RETURNING` rows with `fetch_all`. sqlite commits an
// autocommit statement only once it has stepped to completion, and
// `fetch_one`/`fetch_optional` stop after the first row, which leaves the write
// invisible to the other pooled connections after the call returns.

#[derive(Clone)]
pub struct SqliteBookStore {
    pool: Pool<Sqlite>,
}

impl SqliteBookStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and run migrations
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is a separate database, so keep exactly one alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("Book store migrations completed");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        input.validate()?;

        let book = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books (title, author, isbn, available) VALUES (?, ?, ?, 1) RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(&input.title)
        .bind(&input.author)
        .bind(&input.isbn)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(book)
    }

    async fn get(&self, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = ?",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY id",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn search(&self, needle: &str) -> AppResult<Vec<Book>> {
        // sqlite lower()/LIKE fold ASCII only, so match in Rust
        let books = self.list().await?;
        Ok(books.into_iter().filter(|b| b.title_contains(needle)).collect())
    }

    async fn update(&self, id: i64, input: &BookInput) -> AppResult<Book> {
        input.validate()?;

        sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET title = ?, author = ?, isbn = ? WHERE id = ? RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(&input.title)
        .bind(&input.author)
        .bind(&input.isbn)
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::book_not_found(id))
    }

    async fn set_available(&self, id: i64, available: bool) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET available = ? WHERE id = ? RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(available)
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::book_not_found(id))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Book store pool closed");
    }
}
