//! Medical Records Backend Library
//!
//! Exposes the service modules for the server binary and integration tests.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod middleware;

pub use app::{router, AppState};
pub use config::Config;
pub use error::ApiError;
