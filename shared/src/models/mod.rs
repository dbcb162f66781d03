//! Domain models

pub mod notification;
pub mod order;
pub mod rate;
