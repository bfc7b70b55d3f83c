//! API handlers for Shelfmark REST endpoints

pub mod books;
pub mod health;
pub mod openapi;

use axum::{
    extract::OriginalUri,
    http::Method,
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route(
            "/health",
            get(health::health_check).fallback(method_not_allowed),
        )
        .route(
            "/ready",
            get(health::readiness_check).fallback(method_not_allowed),
        )
        // Catalog
        .route(
            "/books",
            get(books::list_books)
                .post(books::create_book)
                .fallback(method_not_allowed),
        )
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book)
                .fallback(method_not_allowed),
        )
        // Lending
        .route(
            "/books/:id/borrow",
            put(books::borrow_book).fallback(method_not_allowed),
        )
        .route(
            "/books/:id/return",
            put(books::return_book).fallback(method_not_allowed),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .fallback(unknown_route)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn unknown_route(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::Routing(format!("No route for {} {}", method, uri.path()))
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::MethodNotAllowed(format!("{} is not supported on {}", method, uri.path()))
}
