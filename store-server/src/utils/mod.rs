//! Utility module - shared helpers and types
//!
//! - [`AppError`] / [`AppResult`] - HTTP-level error type and alias
//! - [`logger`] - tracing subscriber setup
//! - [`validation`] - postal code and text validation helpers
//! - [`rate_limit`] - windowed per-key attempt bookkeeping

pub mod error;
pub mod logger;
pub mod rate_limit;
pub mod validation;

pub use error::{AppError, AppResponse, AppResult, ok, ok_with_message};
pub use rate_limit::RateLimiter;
