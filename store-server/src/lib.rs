//! Store Server - order fulfillment orchestration for the storefront
//!
//! # Architecture overview
//!
//! The server sits between the storefront and three kinds of external
//! collaborators: payment providers, shipping carriers, and the
//! address/rate services. It owns the order state machine and absorbs
//! the messiness of provider callbacks (at-least-once, unordered).
//!
//! # Module structure
//!
//! ```text
//! store-server/src/
//! ├── core/       # config, state, server startup
//! ├── api/        # HTTP routes and handlers
//! ├── orders/     # order orchestrator and persistence
//! ├── payment/    # payment gateway adapters
//! ├── shipping/   # shipping gateway adapters
//! ├── rates/      # rate estimation with local fallback
//! ├── address/    # postal code resolution
//! ├── notify/     # customer notification sink
//! └── utils/      # errors, logging, validation, rate limiting
//! ```

pub mod address;
pub mod api;
pub mod core;
pub mod notify;
pub mod orders;
pub mod payment;
pub mod rates;
pub mod shipping;
pub mod utils;

pub use crate::core::{Config, Server, ServerState};
pub use orders::{OrderManager, OrderStore};
pub use utils::{AppError, AppResult};

// Re-export logger setup
pub use utils::logger::init_logger;

/// Load `.env`, then set up logging from the resulting environment
pub fn setup_environment() {
    // Missing .env is fine; variables may come from the real env
    let _ = dotenv::dotenv();
    init_logger("info");
}
