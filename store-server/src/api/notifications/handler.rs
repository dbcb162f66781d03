//! Notifications API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use shared::Notification;

use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub order_id: String,
}

/// Notifications emitted for one order, oldest first
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Vec<Notification>>>> {
    let notifications = state.orders.list_notifications(&query.order_id).await;
    Ok(ok(notifications))
}
