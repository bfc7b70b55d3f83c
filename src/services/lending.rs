//! Lending service: the borrow/return state machine
//!
//! Borrow and return are check-then-write sequences over the store. Both run
//! while holding the book's entry in a [`LockTable`], so two callers can never
//! interleave their read/decide/write on the same id. Different ids never
//! wait on each other.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, LendingState},
    repository::BookStore,
};

/// One mutex per book id, created on demand and evicted when unused
#[derive(Default)]
pub struct LockTable {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

/// Exclusive hold on a book id, released on drop
pub struct BookLock<'a> {
    table: &'a LockTable,
    id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`, at most `timeout` if given
    pub async fn acquire(&self, id: i64, timeout: Option<Duration>) -> AppResult<BookLock<'_>> {
        // The map ref must not be held across the await below
        let mutex = self.locks.entry(id).or_default().clone();

        let guard = match timeout {
            Some(limit) => {
                let acquired = tokio::time::timeout(limit, mutex.lock_owned()).await;
                match acquired {
                    Ok(guard) => guard,
                    Err(_) => {
                        self.evict(id);
                        tracing::warn!(book_id = id, ?limit, "Timed out waiting for book lock");
                        return Err(AppError::Busy(format!(
                            "Book with id {} is busy, try again later",
                            id
                        )));
                    }
                }
            }
            None => mutex.lock_owned().await,
        };

        Ok(BookLock {
            table: self,
            id,
            guard: Some(guard),
        })
    }

    /// Number of ids currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn evict(&self, id: i64) {
        // Clones are only taken under the shard lock, so a count of 1 means nobody else has it
        self.locks.remove_if(&id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl Drop for BookLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.table.evict(self.id);
    }
}

#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn BookStore>,
    locks: Arc<LockTable>,
    lock_timeout: Option<Duration>,
}

impl LendingService {
    pub fn new(store: Arc<dyn BookStore>, lock_timeout: Option<Duration>) -> Self {
        Self {
            store,
            locks: Arc::new(LockTable::new()),
            lock_timeout,
        }
    }

    /// Available -> Borrowed
    pub async fn borrow(&self, id: i64) -> AppResult<Book> {
        let _lock = self.locks.acquire(id, self.lock_timeout).await?;

        let book = self.load(id).await?;
        if book.lending_state() == LendingState::Borrowed {
            tracing::debug!(book_id = id, "Borrow rejected, book already borrowed");
            return Err(AppError::AlreadyBorrowed(format!(
                "Book with id {} is already borrowed",
                id
            )));
        }

        let book = self.store.set_available(id, false).await?;
        tracing::info!(book_id = id, title = %book.title, "Book borrowed");
        Ok(book)
    }

    /// Borrowed -> Available. Returning an available book succeeds without a write.
    pub async fn return_book(&self, id: i64) -> AppResult<Book> {
        let _lock = self.locks.acquire(id, self.lock_timeout).await?;

        let book = self.load(id).await?;
        if book.lending_state() == LendingState::Available {
            tracing::debug!(book_id = id, "Return of an available book, nothing to do");
            return Ok(book);
        }

        let book = self.store.set_available(id, true).await?;
        tracing::info!(book_id = id, title = %book.title, "Book returned");
        Ok(book)
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    async fn load(&self, id: i64) -> AppResult<Book> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::book_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::book::BookInput,
        repository::{InMemoryBookStore, MockBookStore},
    };
    use async_trait::async_trait;

    /// Delegates to the in-memory store but yields inside every read, so
    /// unsynchronized borrowers would both see `available = true`
    struct SlowStore(InMemoryBookStore);

    #[async_trait]
    impl BookStore for SlowStore {
        async fn create(&self, input: &BookInput) -> AppResult<Book> {
            self.0.create(input).await
        }
        async fn get(&self, id: i64) -> AppResult<Option<Book>> {
            let book = self.0.get(id).await;
            tokio::time::sleep(Duration::from_millis(5)).await;
            book
        }
        async fn list(&self) -> AppResult<Vec<Book>> {
            self.0.list().await
        }
        async fn search(&self, needle: &str) -> AppResult<Vec<Book>> {
            self.0.search(needle).await
        }
        async fn update(&self, id: i64, input: &BookInput) -> AppResult<Book> {
            self.0.update(id, input).await
        }
        async fn set_available(&self, id: i64, available: bool) -> AppResult<Book> {
            self.0.set_available(id, available).await
        }
        async fn delete(&self, id: i64) -> AppResult<()> {
            self.0.delete(id).await
        }
        async fn count(&self) -> AppResult<i64> {
            self.0.count().await
        }
    }

    fn service(store: Arc<dyn BookStore>) -> LendingService {
        LendingService::new(store, Some(Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn test_borrow_return_cycle() {
        let store = Arc::new(InMemoryBookStore::new());
        let book = store
            .create(&BookInput::new("Dune").author("Herbert").isbn("0001"))
            .await
            .unwrap();
        let lending = service(store.clone());

        let borrowed = lending.borrow(book.id).await.unwrap();
        assert!(!borrowed.available);

        let err = lending.borrow(book.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyBorrowed(_)));

        let returned = lending.return_book(book.id).await.unwrap();
        assert!(returned.available);
        assert!(store.get(book.id).await.unwrap().unwrap().available);
    }

    #[tokio::test]
    async fn test_return_available_book_is_noop() {
        let store = Arc::new(InMemoryBookStore::new());
        let book = store.create(&BookInput::new("Dune")).await.unwrap();
        let lending = service(store);

        let returned = lending.return_book(book.id).await.unwrap();
        assert_eq!(returned, book);
    }

    #[tokio::test]
    async fn test_missing_book() {
        let lending = service(Arc::new(InMemoryBookStore::new()));
        assert!(matches!(lending.borrow(3).await, Err(AppError::NotFound(_))));
        assert!(matches!(lending.return_book(3).await, Err(AppError::NotFound(_))));
        assert!(lending.locks().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_single_winner() {
        let store = Arc::new(SlowStore(InMemoryBookStore::new()));
        let book = store.create(&BookInput::new("Dune")).await.unwrap();
        let lending = service(store.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let lending = lending.clone();
                tokio::spawn(async move { lending.borrow(book.id).await })
            })
            .collect();

        let mut won = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => won += 1,
                Err(AppError::AlreadyBorrowed(_)) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(won, 1);
        assert_eq!(rejected, 15);
        assert!(!store.get(book.id).await.unwrap().unwrap().available);
        assert!(lending.locks().is_empty());
    }

    #[tokio::test]
    async fn test_busy_when_lock_held() {
        let store = Arc::new(InMemoryBookStore::new());
        let book = store.create(&BookInput::new("Dune")).await.unwrap();
        let lending = LendingService::new(store.clone(), Some(Duration::from_millis(20)));

        let held = lending.locks().acquire(book.id, None).await.unwrap();
        let err = lending.borrow(book.id).await.unwrap_err();
        assert!(matches!(err, AppError::Busy(_)));
        assert!(store.get(book.id).await.unwrap().unwrap().available);

        drop(held);
        assert!(lending.locks().is_empty());
        lending.borrow(book.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_other_ids_do_not_wait() {
        let store = Arc::new(InMemoryBookStore::new());
        let a = store.create(&BookInput::new("A")).await.unwrap();
        let b = store.create(&BookInput::new("B")).await.unwrap();
        let lending = LendingService::new(store, Some(Duration::from_millis(20)));

        let _held = lending.locks().acquire(a.id, None).await.unwrap();
        lending.borrow(b.id).await.unwrap();
        assert_eq!(lending.locks().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockBookStore::new();
        store
            .expect_get()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        store.expect_set_available().never();

        let lending = service(Arc::new(store));
        assert!(matches!(lending.borrow(1).await, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_book_deleted_between_read_and_write() {
        let mut store = MockBookStore::new();
        store.expect_get().returning(|id| {
            Ok(Some(Book {
                id,
                title: "Gone".to_string(),
                author: None,
                isbn: None,
                available: true,
            }))
        });
        store
            .expect_set_available()
            .returning(|id, _| Err(AppError::book_not_found(id)));

        let lending = service(Arc::new(store));
        assert!(matches!(lending.borrow(1).await, Err(AppError::NotFound(_))));
    }
}
