//! Cinerent film equipment rental server
//!
//! REST JSON API for renting film equipment: equipment catalog, booking
//! requests with conflict detection, and the approve / check-out / check-in
//! lifecycle.

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
