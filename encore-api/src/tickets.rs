use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use encore_core::models::{Ticket, TicketStatus};
use encore_core::repository::TicketLookup;
use encore_order::{CancelOutcome, ScanOutcome};
use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketView>,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveQuery {
    /// Ticket code, internal order id or gateway order id — all accepted
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub tickets: Vec<TicketView>,
}

/// Denormalized ticket info for display and QR rendering
#[derive(Debug, Serialize)]
pub struct TicketView {
    pub code: String,
    pub status: TicketStatus,
    pub event_name: String,
    pub attendee_name: String,
    pub attendee_email: String,
    pub used_at: Option<DateTime<Utc>>,
}

impl From<Ticket> for TicketView {
    fn from(ticket: Ticket) -> Self {
        Self {
            code: ticket.code,
            status: ticket.status,
            event_name: ticket.event_name,
            attendee_name: ticket.attendee_name,
            attendee_email: ticket.attendee_email,
            used_at: ticket.used_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/tickets/validate
/// Door-side scan. Rejections still return the ticket when one exists so
/// staff can judge manually.
pub async fn validate_ticket(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, AppError> {
    let outcome = state
        .validator
        .scan(&req.code)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let response = match outcome {
        ScanOutcome::Admitted { ticket } => ValidateResponse {
            success: true,
            message: "Ticket valid".to_string(),
            ticket: Some(ticket.into()),
        },
        ScanOutcome::Rejected { reason, ticket } => ValidateResponse {
            success: false,
            message: reason.message().to_string(),
            ticket: ticket.map(Into::into),
        },
    };

    Ok(Json(response))
}

/// GET /v1/tickets?key=...
/// Ticket retrieval for the email link and the account page. The key is
/// tried as a ticket code first, then as an internal order id when it
/// parses as a UUID, then as a gateway order id.
pub async fn retrieve_tickets(
    State(state): State<AppState>,
    Query(query): Query<RetrieveQuery>,
) -> Result<Json<RetrieveResponse>, AppError> {
    let mut lookups = vec![TicketLookup::Code(query.key.clone())];
    if let Ok(order_id) = Uuid::parse_str(&query.key) {
        lookups.push(TicketLookup::OrderId(order_id));
    }
    lookups.push(TicketLookup::ExternalOrderId(query.key.clone()));

    for lookup in &lookups {
        let tickets = state
            .ticket_repo
            .find_tickets(lookup)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        if !tickets.is_empty() {
            return Ok(Json(RetrieveResponse {
                tickets: tickets.into_iter().map(Into::into).collect(),
            }));
        }
    }

    Err(AppError::NotFoundError(format!(
        "No tickets found for key {}",
        query.key
    )))
}

/// POST /v1/tickets/{code}/cancel
/// Administrative cancel: active -> cancelled only; anything else is a
/// no-op.
pub async fn cancel_ticket(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ValidateResponse>, AppError> {
    let outcome = state
        .validator
        .cancel(&code)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let response = match outcome {
        CancelOutcome::Cancelled(ticket) => ValidateResponse {
            success: true,
            message: "Ticket cancelled".to_string(),
            ticket: Some(ticket.into()),
        },
        CancelOutcome::NoOp(ticket) => ValidateResponse {
            success: false,
            message: format!("Ticket is {}, nothing to cancel", ticket.status.as_str()),
            ticket: Some(ticket.into()),
        },
        CancelOutcome::NotFound => {
            return Err(AppError::NotFoundError(format!("No ticket with code {code}")))
        }
    };

    Ok(Json(response))
}
