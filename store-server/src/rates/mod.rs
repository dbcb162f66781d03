//! Shipping rate estimation
//!
//! - `estimator`: carrier-backed quoting with local fallback
//! - `fallback`: pure region/weight/distance rate tables

pub mod estimator;
pub mod fallback;

pub use estimator::{RateError, RateEstimator};
