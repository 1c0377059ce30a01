use std::sync::Arc;

use encore_catalog::ItemCategory;
use encore_core::models::{Order, Ticket, TicketSummary};
use encore_core::repository::TicketRepository;

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("event line item has no catalog reference")]
    MissingEventRef,

    #[error("store error: {0}")]
    Store(String),
}

/// Mints one ticket per purchased event-ticket unit.
pub struct TicketIssuer {
    tickets: Arc<dyn TicketRepository>,
}

impl TicketIssuer {
    pub fn new(tickets: Arc<dyn TicketRepository>) -> Self {
        Self { tickets }
    }

    /// Issue tickets for every event line item of an already-committed
    /// order. No rollback on partial failure: if ticket N of M fails to
    /// persist, tickets 1..N-1 stay committed and the error propagates —
    /// an operator reconciles the remainder manually.
    pub async fn issue_tickets(&self, order: &Order) -> Result<Vec<TicketSummary>, IssueError> {
        let mut issued = Vec::new();

        for item in order
            .items
            .iter()
            .filter(|item| item.category == ItemCategory::Event)
        {
            let event_id = item.catalog_ref.ok_or(IssueError::MissingEventRef)?;

            for _ in 0..item.quantity {
                let ticket = Ticket::issue(order, event_id, &item.name);
                self.tickets
                    .insert_ticket(&ticket)
                    .await
                    .map_err(|e| IssueError::Store(e.to_string()))?;
                issued.push(ticket.summary());
            }
        }

        if !issued.is_empty() {
            tracing::info!(order_id = %order.id, count = issued.len(), "tickets issued");
        }
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use encore_core::models::{CustomerInfo, LineItem};
    use encore_store::mem::MemStore;
    use uuid::Uuid;

    fn order_with_event_quantity(event_id: Uuid, quantity: i32) -> Order {
        let customer = CustomerInfo {
            name: "Jo Doe".to_string(),
            email: "jo@example.com".to_string(),
            locale: "en".to_string(),
        };
        Order::free(
            &customer,
            vec![
                LineItem {
                    name: "Release Show".to_string(),
                    category: ItemCategory::Event,
                    unit_price: 0.0,
                    quantity,
                    catalog_ref: Some(event_id),
                },
                LineItem {
                    name: "Demo EP".to_string(),
                    category: ItemCategory::AlbumDigital,
                    unit_price: 0.0,
                    quantity: 1,
                    catalog_ref: None,
                },
            ],
            "eur",
        )
    }

    #[tokio::test]
    async fn test_one_ticket_per_unit_with_distinct_codes() {
        let store = Arc::new(MemStore::new());
        let event_id = Uuid::new_v4();
        let order = order_with_event_quantity(event_id, 3);

        let issued = TicketIssuer::new(store.clone())
            .issue_tickets(&order)
            .await
            .unwrap();

        assert_eq!(issued.len(), 3);
        let codes: HashSet<&str> = issued.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes.len(), 3);
        assert_eq!(store.count_sold_sync(event_id), 3);
    }

    #[tokio::test]
    async fn test_non_event_items_issue_nothing() {
        let store = Arc::new(MemStore::new());
        let customer = CustomerInfo {
            name: "Jo Doe".to_string(),
            email: "jo@example.com".to_string(),
            locale: "en".to_string(),
        };
        let order = Order::free(
            &customer,
            vec![LineItem {
                name: "Demo EP".to_string(),
                category: ItemCategory::AlbumDigital,
                unit_price: 0.0,
                quantity: 2,
                catalog_ref: None,
            }],
            "eur",
        );

        let issued = TicketIssuer::new(store.clone())
            .issue_tickets(&order)
            .await
            .unwrap();
        assert!(issued.is_empty());
    }

    #[tokio::test]
    async fn test_attendee_copied_from_order() {
        let store = Arc::new(MemStore::new());
        let event_id = Uuid::new_v4();
        let order = order_with_event_quantity(event_id, 1);

        let issued = TicketIssuer::new(store.clone())
            .issue_tickets(&order)
            .await
            .unwrap();
        assert_eq!(issued[0].attendee_name, order.customer_name);
        assert_eq!(issued[0].event_name, "Release Show");
    }
}
