use std::sync::Arc;

use encore_core::models::{Ticket, TicketStatus};
use encore_core::repository::TicketRepository;

#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    #[error("store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotFound,
    AlreadyUsed,
    Cancelled,
}

impl RejectReason {
    /// Human-readable reason for door staff. Rejections always carry one
    /// so staff can make a manual judgment call.
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::NotFound => "Ticket not found",
            RejectReason::AlreadyUsed => "Ticket already used",
            RejectReason::Cancelled => "Ticket has been cancelled",
        }
    }
}

/// Outcome of scanning a code at the door. Rejections still return the
/// ticket record when one exists, for display.
#[derive(Debug)]
pub enum ScanOutcome {
    Admitted { ticket: Ticket },
    Rejected { reason: RejectReason, ticket: Option<Ticket> },
}

/// Outcome of an administrative cancel. Cancelling a used or
/// already-cancelled ticket is a no-op, not an error.
#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled(Ticket),
    NoOp(Ticket),
    NotFound,
}

/// Door-side ticket state machine. Every transition goes through the
/// repository's conditional-write primitive so two concurrent scans of
/// the same code can never both succeed.
pub struct TicketValidator {
    tickets: Arc<dyn TicketRepository>,
}

impl TicketValidator {
    pub fn new(tickets: Arc<dyn TicketRepository>) -> Self {
        Self { tickets }
    }

    /// Scan a code: active -> used exactly once. The conditional write
    /// runs first; only on a miss do we read the ticket back to explain
    /// why.
    pub async fn scan(&self, code: &str) -> Result<ScanOutcome, ValidatorError> {
        let admitted = self
            .tickets
            .transition_status(code, TicketStatus::Active, TicketStatus::Used)
            .await
            .map_err(|e| ValidatorError::Store(e.to_string()))?;

        if let Some(ticket) = admitted {
            tracing::info!(code, event = %ticket.event_name, "ticket admitted");
            return Ok(ScanOutcome::Admitted { ticket });
        }

        let ticket = self
            .tickets
            .find_by_code(code)
            .await
            .map_err(|e| ValidatorError::Store(e.to_string()))?;

        let outcome = match ticket {
            None => ScanOutcome::Rejected {
                reason: RejectReason::NotFound,
                ticket: None,
            },
            Some(t) => {
                let reason = match t.status {
                    TicketStatus::Cancelled => RejectReason::Cancelled,
                    // Status is monotonic, so a failed conditional write
                    // followed by an "active" read can only mean we lost
                    // a race that is about to commit. Report used.
                    TicketStatus::Used | TicketStatus::Active => RejectReason::AlreadyUsed,
                };
                ScanOutcome::Rejected {
                    reason,
                    ticket: Some(t),
                }
            }
        };

        if let ScanOutcome::Rejected { reason, .. } = &outcome {
            tracing::info!(code, reason = reason.message(), "ticket rejected");
        }
        Ok(outcome)
    }

    /// Administrative cancel, active -> cancelled only. Expressed through
    /// the same conditional primitive, so a used ticket stays used.
    pub async fn cancel(&self, code: &str) -> Result<CancelOutcome, ValidatorError> {
        let cancelled = self
            .tickets
            .transition_status(code, TicketStatus::Active, TicketStatus::Cancelled)
            .await
            .map_err(|e| ValidatorError::Store(e.to_string()))?;

        if let Some(ticket) = cancelled {
            tracing::info!(code, "ticket cancelled");
            return Ok(CancelOutcome::Cancelled(ticket));
        }

        match self
            .tickets
            .find_by_code(code)
            .await
            .map_err(|e| ValidatorError::Store(e.to_string()))?
        {
            Some(ticket) => Ok(CancelOutcome::NoOp(ticket)),
            None => Ok(CancelOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::models::{CustomerInfo, Order, Ticket};
    use encore_store::mem::MemStore;
    use uuid::Uuid;

    async fn seeded_ticket(store: &Arc<MemStore>) -> Ticket {
        let customer = CustomerInfo {
            name: "Jo Doe".to_string(),
            email: "jo@example.com".to_string(),
            locale: "en".to_string(),
        };
        let order = Order::free(&customer, vec![], "eur");
        let ticket = Ticket::issue(&order, Uuid::new_v4(), "Release Show");
        store.insert_ticket(&ticket).await.unwrap();
        ticket
    }

    #[tokio::test]
    async fn test_unknown_code_rejected() {
        let store = Arc::new(MemStore::new());
        let outcome = TicketValidator::new(store).scan("TKT-NOPE").await.unwrap();
        match outcome {
            ScanOutcome::Rejected { reason, ticket } => {
                assert_eq!(reason, RejectReason::NotFound);
                assert!(ticket.is_none());
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_active_ticket_admitted_once() {
        let store = Arc::new(MemStore::new());
        let ticket = seeded_ticket(&store).await;
        let validator = TicketValidator::new(store.clone());

        match validator.scan(&ticket.code).await.unwrap() {
            ScanOutcome::Admitted { ticket: t } => {
                assert_eq!(t.status, TicketStatus::Used);
                assert!(t.used_at.is_some());
            }
            other => panic!("expected admission, got {other:?}"),
        }

        // Second scan must be rejected, ticket still returned for display
        match validator.scan(&ticket.code).await.unwrap() {
            ScanOutcome::Rejected { reason, ticket: t } => {
                assert_eq!(reason, RejectReason::AlreadyUsed);
                assert_eq!(t.unwrap().status, TicketStatus::Used);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_scans_admit_exactly_once() {
        let store = Arc::new(MemStore::new());
        let ticket = seeded_ticket(&store).await;

        let v1 = TicketValidator::new(store.clone());
        let v2 = TicketValidator::new(store.clone());
        let code1 = ticket.code.clone();
        let code2 = ticket.code.clone();

        let (a, b) = tokio::join!(v1.scan(&code1), v2.scan(&code2));
        let outcomes = [a.unwrap(), b.unwrap()];

        let admitted = outcomes
            .iter()
            .filter(|o| matches!(o, ScanOutcome::Admitted { .. }))
            .count();
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn test_cancelled_ticket_rejected_with_reason() {
        let store = Arc::new(MemStore::new());
        let ticket = seeded_ticket(&store).await;
        let validator = TicketValidator::new(store.clone());

        match validator.cancel(&ticket.code).await.unwrap() {
            CancelOutcome::Cancelled(t) => assert_eq!(t.status, TicketStatus::Cancelled),
            other => panic!("expected cancel, got {other:?}"),
        }

        match validator.scan(&ticket.code).await.unwrap() {
            ScanOutcome::Rejected { reason, ticket: t } => {
                assert_eq!(reason, RejectReason::Cancelled);
                assert!(t.is_some());
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_after_use_is_a_noop() {
        let store = Arc::new(MemStore::new());
        let ticket = seeded_ticket(&store).await;
        let validator = TicketValidator::new(store.clone());

        validator.scan(&ticket.code).await.unwrap();

        match validator.cancel(&ticket.code).await.unwrap() {
            CancelOutcome::NoOp(t) => assert_eq!(t.status, TicketStatus::Used),
            other => panic!("expected no-op, got {other:?}"),
        }

        // Status never reverses
        let stored = store.find_by_code(&ticket.code).await.unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Used);
    }

    #[tokio::test]
    async fn test_cancel_unknown_code() {
        let store = Arc::new(MemStore::new());
        let validator = TicketValidator::new(store);
        assert!(matches!(
            validator.cancel("TKT-NOPE").await.unwrap(),
            CancelOutcome::NotFound
        ));
    }
}
