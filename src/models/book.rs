//! Book model and related request/response types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Book record as stored and as rendered on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// Store-assigned identifier
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    /// `true` when the book can be borrowed
    pub available: bool,
}

impl Book {
    pub fn lending_state(&self) -> LendingState {
        if self.available {
            LendingState::Available
        } else {
            LendingState::Borrowed
        }
    }

    /// Case-insensitive (full Unicode folding) title substring match
    pub fn title_contains(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Borrow/return state of a single book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingState {
    Available,
    Borrowed,
}

/// Create/update request body.
///
/// `id` and `available` sent by a client are ignored: ids are assigned by the
/// store and availability only changes through borrow/return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[serde(default)]
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
}

impl BookInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }
}

impl From<&Book> for BookInput {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
        }
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        let mut error = ValidationError::new("title_required");
        error.message = Some("Title required".into());
        return Err(error);
    }
    Ok(())
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive title substring
    pub search: Option<String>,
}

/// Success marker returned by borrow and return
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LendingOutcome {
    pub ok: bool,
    pub book: Book,
}

impl From<Book> for LendingOutcome {
    fn from(book: Book) -> Self {
        Self { ok: true, book }
    }
}
