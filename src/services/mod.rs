//! Business logic services

pub mod catalog;
pub mod lending;

use std::sync::Arc;

use crate::{config::LendingConfig, repository::BookStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
}

impl Services {
    /// Create all services over one shared store handle
    pub fn new(store: Arc<dyn BookStore>, lending_config: &LendingConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone()),
            lending: lending::LendingService::new(store, lending_config.lock_timeout()),
        }
    }
}
