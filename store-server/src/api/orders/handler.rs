//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::Order;

use crate::core::ServerState;
use crate::shipping::TrackingInfo;
use crate::utils::{AppResponse, AppResult, ok};

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// List a buyer's orders, newest first
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Vec<Order>>>> {
    let mut orders = state.orders.list_user_orders(&query.user_id).await?;
    orders.truncate(query.limit);
    Ok(ok(orders))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state.orders.get_order(&id).await?;
    Ok(ok(order))
}

/// Re-attempt label creation after a shipping failure
pub async fn retry_shipping(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state.orders.retry_shipping(&id).await?;
    Ok(ok(order))
}

/// Live tracking for the order's label
pub async fn tracking(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<TrackingInfo>>> {
    let info = state.orders.track_order(&id).await?;
    Ok(ok(info))
}
