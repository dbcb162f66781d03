//! Server state - shared service handles
//!
//! ServerState holds one Arc per collaborator; cloning it is cheap and
//! every request handler receives a clone through axum's state
//! extractor. Provider adapters are selected once from configuration,
//! so handlers never branch on provider identity.

use std::sync::Arc;
use std::time::Duration;

use crate::address::{AddressLookup, ViaCepClient};
use crate::core::Config;
use crate::notify::{MemoryNotificationStore, NotificationStore};
use crate::orders::{MemoryOrderStore, OrderManager, OrderStore};
use crate::payment::{AsaasGateway, MercadoPagoGateway, PaymentGateway};
use crate::rates::RateEstimator;
use crate::shipping::{MelhorEnvioGateway, ShippingGateway, SuperFreteGateway};
use crate::utils::RateLimiter;

/// Largest window any rate-limited action uses; keys idle longer than
/// this are swept
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub orders: Arc<OrderManager>,
    pub rates: Arc<RateEstimator>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl ServerState {
    /// Build the full service graph from configuration
    pub fn initialize(config: &Config) -> Self {
        let payment: Arc<dyn PaymentGateway> = match config.payment_provider.as_str() {
            "asaas" => Arc::new(AsaasGateway::new(config)),
            other => {
                if other != "mercado_pago" {
                    tracing::warn!(provider = %other,
                        "Unknown PAYMENT_PROVIDER; defaulting to mercado_pago");
                }
                Arc::new(MercadoPagoGateway::new(config))
            }
        };
        let shipping: Arc<dyn ShippingGateway> = match config.shipping_carrier.as_str() {
            "melhor_envio" => Arc::new(MelhorEnvioGateway::new(config)),
            other => {
                if other != "super_frete" {
                    tracing::warn!(carrier = %other,
                        "Unknown SHIPPING_CARRIER; defaulting to super_frete");
                }
                Arc::new(SuperFreteGateway::new(config))
            }
        };

        tracing::info!(
            payment = %config.payment_provider,
            carrier = %config.shipping_carrier,
            "Providers selected"
        );

        Self::with_services(
            config.clone(),
            Arc::new(MemoryOrderStore::new()),
            Arc::new(MemoryNotificationStore::new()),
            payment,
            shipping,
            Arc::new(ViaCepClient::new(config)),
        )
    }

    /// Assemble state from explicit collaborators (tests swap in mocks)
    pub fn with_services(
        config: Config,
        store: Arc<dyn OrderStore>,
        notifications: Arc<dyn NotificationStore>,
        payment: Arc<dyn PaymentGateway>,
        shipping: Arc<dyn ShippingGateway>,
        address: Arc<dyn AddressLookup>,
    ) -> Self {
        let rates = Arc::new(RateEstimator::new(&config));
        let orders = Arc::new(OrderManager::new(
            store,
            notifications,
            payment,
            shipping,
            rates.clone(),
            address,
            config.default_item_weight_kg,
        ));
        Self {
            config,
            orders,
            rates,
            rate_limiter: Arc::new(RateLimiter::new()),
        }
    }

    /// Start background maintenance tasks
    pub fn start_background_tasks(&self) {
        self.rate_limiter
            .start_sweeper(RATE_LIMIT_WINDOW, RATE_LIMIT_SWEEP_INTERVAL);
    }
}
