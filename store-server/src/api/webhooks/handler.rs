//! Webhook API Handlers

use axum::{Json, extract::State};
use serde::Serialize;
use shared::webhook::{PaymentWebhook, ShippingWebhook};

use crate::core::ServerState;
use crate::orders::{OrderError, ShippingEvent};
use crate::utils::{AppResponse, AppResult, ok, ok_with_message};

#[derive(Debug, Serialize)]
pub struct Received {
    pub received: bool,
}

fn received() -> Received {
    Received { received: true }
}

/// Payment provider callback
pub async fn payment(
    State(state): State<ServerState>,
    Json(hook): Json<PaymentWebhook>,
) -> AppResult<Json<AppResponse<Received>>> {
    match state.orders.process_payment_webhook(&hook).await {
        Ok(Some(order)) => {
            tracing::info!(order_id = %order.id, status = ?order.payment_status,
                "Payment webhook processed");
            Ok(ok(received()))
        }
        Ok(None) => Ok(ok_with_message(received(), "Ignored")),
        Err(OrderError::StateConflict { .. }) | Err(OrderError::NotFound(_)) => {
            // Duplicate, out-of-order, or referencing an order we never
            // created; acknowledged so the provider stops redelivering
            tracing::warn!(charge_id = %hook.data.id, "Payment webhook dropped");
            Ok(ok_with_message(received(), "Dropped"))
        }
        Err(e) => {
            // Transient: a non-2xx asks the provider to redeliver later
            tracing::error!(charge_id = %hook.data.id, error = %e,
                "Payment webhook processing failed");
            Err(e.into())
        }
    }
}

/// Shipping carrier callback
pub async fn shipping(
    State(state): State<ServerState>,
    Json(hook): Json<ShippingWebhook>,
) -> AppResult<Json<AppResponse<Received>>> {
    let Some(event) = ShippingEvent::parse(&hook.event, &hook.data) else {
        tracing::info!(event = %hook.event, order_id = %hook.data.order_id,
            "Unknown shipping event acknowledged");
        return Ok(ok_with_message(received(), "Ignored"));
    };

    match state
        .orders
        .apply_shipping_event(&hook.data.order_id, event)
        .await
    {
        Ok(order) => {
            tracing::info!(order_id = %order.id, status = ?order.shipping_status,
                "Shipping webhook processed");
            Ok(ok(received()))
        }
        Err(OrderError::StateConflict { .. }) | Err(OrderError::NotFound(_)) => {
            tracing::warn!(order_id = %hook.data.order_id, event = %hook.event,
                "Shipping webhook dropped");
            Ok(ok_with_message(received(), "Dropped"))
        }
        Err(e) => {
            tracing::error!(order_id = %hook.data.order_id, error = %e,
                "Shipping webhook processing failed");
            Err(e.into())
        }
    }
}
