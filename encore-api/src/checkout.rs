use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use encore_catalog::ItemCategory;
use encore_core::gateway::CreateSessionItem;
use encore_core::models::{CartItem, CustomerInfo, Order, TicketSummary};
use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    #[serde(rename = "type")]
    pub item_type: ItemCategory,
    pub id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CartItemRequest>,
    pub customer_name: String,
    pub customer_email: String,
    pub locale: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeCheckoutResponse {
    pub success: bool,
    pub order_id: Uuid,
    pub tickets: Vec<TicketSummary>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub url: String,
}

fn to_cart(items: &[CartItemRequest]) -> Vec<CartItem> {
    items
        .iter()
        .map(|item| CartItem {
            category: item.item_type,
            catalog_ref: item.id,
            quantity: item.quantity,
        })
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/checkout/session
/// Start a paid checkout: re-price the cart server-side and create a
/// gateway session for the client to be redirected to. Fulfillment
/// happens later, from the webhook.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    if req.items.is_empty() {
        return Err(AppError::ValidationError {
            message: "Cart is empty".to_string(),
            details: None,
        });
    }

    let customer = CustomerInfo {
        name: req.customer_name,
        email: req.customer_email,
        locale: req.locale,
    };

    let lines = state
        .assembler
        .price_cart(&to_cart(&req.items))
        .await
        .map_err(AppError::from_checkout)?;

    // A zero-total cart has nothing to charge; the gateway would reject
    // the session anyway. Point the client at the free flow instead.
    let total: f64 = lines.iter().map(|line| line.line_total()).sum();
    if total == 0.0 {
        return Err(AppError::ValidationError {
            message: "Cart total is zero".to_string(),
            details: Some("use the free checkout endpoint for zero-amount carts".to_string()),
        });
    }

    let session_items: Vec<CreateSessionItem> = lines
        .iter()
        .map(|line| CreateSessionItem {
            name: line.name.clone(),
            // Gateway speaks minor units
            unit_amount: (line.unit_price * 100.0).round() as i64,
            quantity: line.quantity,
            category: line.category,
            catalog_ref: line.catalog_ref,
        })
        .collect();

    let redirect = state
        .gateway
        .create_session(&session_items, &customer)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!(session_id = %redirect.id, "checkout session created");
    Ok(Json(CreateSessionResponse {
        session_id: redirect.id,
        url: redirect.url,
    }))
}

/// POST /v1/checkout/free
/// Synchronous checkout for zero-amount carts: assemble, issue tickets,
/// send the confirmation, return the order id for redirect.
pub async fn free_checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<FreeCheckoutResponse>, AppError> {
    let customer = CustomerInfo {
        name: req.customer_name,
        email: req.customer_email,
        locale: req.locale,
    };

    let order = state
        .assembler
        .assemble_free(&to_cart(&req.items), &customer, &state.currency)
        .await
        .map_err(AppError::from_checkout)?;

    let tickets = issue_and_notify(&state, &order).await;

    Ok(Json(FreeCheckoutResponse {
        success: true,
        order_id: order.id,
        tickets,
    }))
}

/// Downstream half of the pipeline, shared by the free flow and the
/// webhook. The order is committed by the time this runs, so neither a
/// ticket nor an email failure may fail the request — both are logged
/// for manual reconciliation instead.
pub(crate) async fn issue_and_notify(state: &AppState, order: &Order) -> Vec<TicketSummary> {
    let tickets = match state.issuer.issue_tickets(order).await {
        Ok(tickets) => tickets,
        Err(e) => {
            tracing::error!(order_id = %order.id, error = %e, "ticket issuance failed after order commit");
            Vec::new()
        }
    };

    if let Err(e) = state.mailer.send_confirmation(order, &tickets).await {
        tracing::error!(order_id = %order.id, error = %e, "confirmation email failed");
    }

    tickets
}
