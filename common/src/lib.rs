//! Shared building blocks for the form services.
//!
//! - [`config`]: application and per-project database configuration
//! - [`errors`]: the error taxonomy and its HTTP mapping
//! - [`response`]: the unified JSON response envelope
//! - [`middleware`]: request id and security header middleware
//! - [`extractors`]: validated JSON bodies and client metadata
//! - [`models`]: request/response DTOs for contact and newsletter endpoints

pub mod config;
pub mod errors;
pub mod extractors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;

pub use errors::{AppError, AppResult};
pub use response::ApiResponse;
