//! Checkout API Handlers

use std::time::Duration;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::models::order::{Buyer, LineItem, OrderStatus, PaymentMethod, ShippingAddress};
use validator::Validate;

use crate::core::ServerState;
use crate::orders::CheckoutInput;
use crate::payment::CardInstrument;
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

/// Checkout attempts allowed per buyer per window
const CHECKOUT_MAX_ATTEMPTS: usize = 5;
const CHECKOUT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize, Validate)]
pub struct BuyerInput {
    #[validate(length(min = 1, max = 100))]
    pub id: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemInput {
    pub product_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    #[serde(default)]
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 8, max = 9))]
    pub postal_code: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub street: String,
    #[validate(length(min = 1, max = 20))]
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub district: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub city: String,
    #[serde(default)]
    #[validate(length(max = 2))]
    pub state: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(nested)]
    pub buyer: BuyerInput,
    pub items: Vec<ItemInput>,
    #[validate(nested)]
    pub address: AddressInput,
    pub payment_method: PaymentMethod,
    /// Preferred shipping service id; omitted picks the cheapest
    #[serde(default)]
    pub shipping_service_id: Option<String>,
    /// Tokenized card, required only for credit_card payments
    #[serde(default)]
    pub card: Option<CardInstrument>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub status: OrderStatus,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<String>,
}

/// Create an order and attempt the charge
pub async fn checkout(
    State(state): State<ServerState>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<AppResponse<CheckoutResponse>>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    if !state.rate_limiter.check(
        "checkout",
        &payload.buyer.id,
        CHECKOUT_MAX_ATTEMPTS,
        CHECKOUT_WINDOW,
    ) {
        return Err(AppError::RateLimited(
            "too many checkout attempts, try again in a minute".into(),
        ));
    }

    if payload.payment_method == PaymentMethod::CreditCard && payload.card.is_none() {
        return Err(AppError::validation(
            "credit_card payments require tokenized card data",
        ));
    }

    let input = CheckoutInput {
        buyer: Buyer {
            id: payload.buyer.id,
            email: payload.buyer.email,
            name: payload.buyer.name,
        },
        items: payload
            .items
            .into_iter()
            .map(|i| LineItem {
                product_id: i.product_id,
                name: i.name,
                unit_price: i.unit_price,
                quantity: i.quantity,
                weight_kg: i.weight_kg,
            })
            .collect(),
        address: ShippingAddress {
            postal_code: payload.address.postal_code,
            street: payload.address.street,
            number: payload.address.number,
            complement: payload.address.complement,
            district: payload.address.district,
            city: payload.address.city,
            state: payload.address.state,
            phone: payload.address.phone,
            document: payload.address.document,
        },
        payment_method: payload.payment_method,
        shipping_service_id: payload.shipping_service_id,
        card: payload.card,
    };

    let outcome = state.orders.create_order(input).await?;
    let response = CheckoutResponse {
        order_id: outcome.order.id.clone(),
        status: outcome.order.status,
        total: outcome.order.total,
        redirect_url: outcome.redirect_url,
        payment_error: outcome.order.payment_error.clone(),
    };

    if outcome.order.status == OrderStatus::PaymentFailed {
        return Ok(ok_with_message(response, "Order created, payment failed"));
    }
    Ok(ok(response))
}
