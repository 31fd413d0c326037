//! Bookhold library lending server
//!
//! Members borrow and return books; librarians manage the catalog and the
//! member list. The lending service keeps each book's borrower and each
//! member's book list in agreement over a per-record atomic document store.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire repositories and services over a document store
    pub fn new(config: AppConfig, store: Arc<dyn store::DocumentStore>) -> Self {
        let repository = repository::Repository::new(store);
        let services = services::Services::new(repository, &config.auth);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
