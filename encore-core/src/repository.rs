use async_trait::async_trait;
use uuid::Uuid;
use encore_catalog::{Event, Product};

use crate::models::{Order, Ticket, TicketStatus};

/// A ticket-retrieval key. The storefront accepts a ticket code, an
/// internal order id or a gateway session id interchangeably; the
/// repository resolves whichever kind it is handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketLookup {
    Code(String),
    OrderId(Uuid),
    ExternalOrderId(String),
}

/// Repository trait for catalog reads. The catalog itself is owned by the
/// CMS; the engine only ever looks records up by reference.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_event(
        &self,
        id: Uuid,
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_product(
        &self,
        id: Uuid,
    ) -> Result<Option<Product>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Outcome of an order insert. `created` is false when the unique
/// external id already existed, i.e. a retried webhook delivery.
#[derive(Debug, Clone, Copy)]
pub struct CreateOrderOutcome {
    pub id: Uuid,
    pub created: bool,
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert the order and its items. Upsert-by-external-id semantics:
    /// a duplicate external id returns the existing row's id with
    /// `created: false` and writes nothing.
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<CreateOrderOutcome, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for ticket data access
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn insert_ticket(
        &self,
        ticket: &Ticket,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Ticket>, Box<dyn std::error::Error + Send + Sync>>;

    /// Atomically move a ticket from `from` to `to` in one conditional
    /// write. Returns the updated ticket on success, `None` when the
    /// ticket is missing or no longer in `from`. This is the only status
    /// mutation the store exposes — a separate read followed by a write
    /// would leave a race window between concurrent scans.
    async fn transition_status(
        &self,
        code: &str,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<Option<Ticket>, Box<dyn std::error::Error + Send + Sync>>;

    /// Count of non-cancelled tickets referencing an event. Advisory for
    /// tier limits: read fresh per request, never reserved.
    async fn count_sold(
        &self,
        event_id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_tickets(
        &self,
        lookup: &TicketLookup,
    ) -> Result<Vec<Ticket>, Box<dyn std::error::Error + Send + Sync>>;
}
