//! Server configuration
//!
//! All settings can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | PUBLIC_BASE_URL | http://localhost:3000 | Base URL for redirect/notification callbacks |
//! | ORIGIN_POSTAL_CODE | 59140000 | Warehouse origin CEP |
//! | PAYMENT_PROVIDER | mercado_pago | mercado_pago \| asaas |
//! | SHIPPING_CARRIER | super_frete | melhor_envio \| super_frete |
//! | MERCADO_PAGO_TOKEN / ASAAS_API_KEY / MELHOR_ENVIO_TOKEN / SUPER_FRETE_TOKEN | placeholder | Provider credentials |
//! | REQUEST_TIMEOUT_MS | 30000 | Outbound HTTP timeout |

/// Known placeholder credential values shipped in sample configs.
/// A placeholder credential means "provider unconfigured": the rate
/// estimator goes straight to the fallback table and the carrier
/// issues simulated labels instead of calling out.
const PLACEHOLDER_TOKENS: &[&str] = &[
    "",
    "SUA_API_KEY_AQUI",
    "SEU_TOKEN_AQUI",
    "TOKEN_TEMPORARIO_MELHOR_ENVIO_12345",
];

/// Whether a credential is absent or a known sample placeholder
pub fn is_placeholder_token(token: &str) -> bool {
    PLACEHOLDER_TOKENS.contains(&token.trim())
}

/// Default box dimensions in cm for single-package quotes
#[derive(Debug, Clone, Copy)]
pub struct PackageDimensions {
    pub height_cm: f64,
    pub width_cm: f64,
    pub length_cm: f64,
}

impl Default for PackageDimensions {
    fn default() -> Self {
        Self {
            height_cm: 2.0,
            width_cm: 11.0,
            length_cm: 16.0,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Public base URL used in provider back-URLs and webhook URLs
    pub public_base_url: String,

    // === Store ===
    /// Warehouse origin CEP (8 digits)
    pub origin_postal_code: String,
    /// Default per-item weight in kg when the catalog snapshot has none
    pub default_item_weight_kg: f64,
    /// Default quoting box
    pub package_dimensions: PackageDimensions,

    // === Providers ===
    /// Active payment provider: mercado_pago | asaas
    pub payment_provider: String,
    /// Active shipping carrier: melhor_envio | super_frete
    pub shipping_carrier: String,
    pub mercado_pago_base_url: String,
    pub mercado_pago_token: String,
    pub asaas_base_url: String,
    pub asaas_api_key: String,
    pub melhor_envio_base_url: String,
    pub melhor_envio_token: String,
    pub super_frete_base_url: String,
    pub super_frete_token: String,
    pub viacep_base_url: String,

    /// Outbound HTTP request timeout (milliseconds)
    pub request_timeout_ms: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: env_or("ENVIRONMENT", "development"),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:3000"),

            origin_postal_code: env_or("ORIGIN_POSTAL_CODE", "59140000"),
            default_item_weight_kg: std::env::var("DEFAULT_ITEM_WEIGHT_KG")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.3),
            package_dimensions: PackageDimensions::default(),

            payment_provider: env_or("PAYMENT_PROVIDER", "mercado_pago"),
            shipping_carrier: env_or("SHIPPING_CARRIER", "super_frete"),
            mercado_pago_base_url: env_or("MERCADO_PAGO_BASE_URL", "https://api.mercadopago.com"),
            mercado_pago_token: env_or("MERCADO_PAGO_TOKEN", "SUA_API_KEY_AQUI"),
            asaas_base_url: env_or("ASAAS_BASE_URL", "https://sandbox.asaas.com/api/v3"),
            asaas_api_key: env_or("ASAAS_API_KEY", "SUA_API_KEY_AQUI"),
            melhor_envio_base_url: env_or("MELHOR_ENVIO_BASE_URL", "https://www.melhorenvio.com.br"),
            melhor_envio_token: env_or("MELHOR_ENVIO_TOKEN", "TOKEN_TEMPORARIO_MELHOR_ENVIO_12345"),
            super_frete_base_url: env_or("SUPER_FRETE_BASE_URL", "https://api.superfrete.com"),
            super_frete_token: env_or("SUPER_FRETE_TOKEN", "SEU_TOKEN_AQUI"),
            viacep_base_url: env_or("VIACEP_BASE_URL", "https://viacep.com.br/ws"),

            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
