//! Shelfmark Book Inventory
//!
//! A small library server: a catalog of books backed by a single-file sqlite
//! store (or process memory), with borrow/return lending and a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn repository::BookStore>) -> Self {
        let services = services::Services::new(store, &config.lending);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
