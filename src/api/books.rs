//! Book catalog and lending endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput, BookQuery, LendingOutcome},
};

type BookId = WithRejection<Path<i64>, AppError>;

/// List books, optionally filtered by title
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    WithRejection(Query(query), _): WithRejection<Query<BookQuery>, AppError>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books(&query).await?;
    Ok(Json(books))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 400, description = "Book not found or malformed id", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): BookId,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Empty title or malformed body", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    WithRejection(Json(input), _): WithRejection<Json<BookInput>, AppError>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.catalog.create_book(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update title, author and isbn of a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Book not found, empty title or malformed body", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): BookId,
    WithRejection(Json(input), _): WithRejection<Json<BookInput>, AppError>,
) -> AppResult<Json<Book>> {
    let updated = state.services.catalog.update_book(id, input).await?;
    Ok(Json(updated))
}

/// Delete a book (deleting a missing book succeeds)
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Malformed id", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): BookId,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Borrow a book
#[utoipa::path(
    put,
    path = "/books/{id}/borrow",
    tag = "lending",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book borrowed", body = LendingOutcome),
        (status = 400, description = "Book not found or already borrowed", body = crate::error::ErrorResponse),
        (status = 503, description = "Another operation on this book is in progress", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): BookId,
) -> AppResult<Json<LendingOutcome>> {
    let book = state.services.lending.borrow(id).await?;
    Ok(Json(book.into()))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/books/{id}/return",
    tag = "lending",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = LendingOutcome),
        (status = 400, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 503, description = "Another operation on this book is in progress", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): BookId,
) -> AppResult<Json<LendingOutcome>> {
    let book = state.services.lending.return_book(id).await?;
    Ok(Json(book.into()))
}
