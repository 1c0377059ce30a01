use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use encore_core::models::Order;
use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/orders/{id}
/// Order detail for the back-office dashboard
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .order_repo
        .get_order(order_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("Order not found: {order_id}")))?;

    Ok(Json(order))
}
