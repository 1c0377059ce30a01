//! In-memory store used by tests.
//!
//! Implements every repository trait against plain maps behind a mutex,
//! so the pipeline and the validator's conditional-write semantics can
//! be exercised without a database. The status transition happens under
//! a single lock acquisition, matching the atomicity the Postgres
//! conditional UPDATE provides.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use encore_catalog::{Event, Product};
use encore_core::models::{Order, Ticket, TicketStatus};
use encore_core::repository::{
    CatalogRepository, CreateOrderOutcome, OrderRepository, TicketLookup, TicketRepository,
};

#[derive(Default)]
pub struct MemStore {
    events: Mutex<HashMap<Uuid, Event>>,
    products: Mutex<HashMap<Uuid, Product>>,
    orders: Mutex<Vec<Order>>,
    tickets: Mutex<Vec<Ticket>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_event(&self, event: Event) {
        self.events.lock().unwrap().insert(event.id, event);
    }

    pub fn seed_product(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }

    /// Seed `count` already-sold tickets against an event, for tier-limit
    /// scenarios.
    pub fn seed_sold_count(&self, event_id: Uuid, count: i64) {
        let mut tickets = self.tickets.lock().unwrap();
        for _ in 0..count {
            tickets.push(Ticket {
                id: Uuid::new_v4(),
                code: format!("TKT-{}", Uuid::new_v4().simple()),
                status: TicketStatus::Active,
                event_id,
                event_name: "seeded".to_string(),
                order_id: Uuid::new_v4(),
                attendee_name: "seeded".to_string(),
                attendee_email: "seeded@example.com".to_string(),
                used_at: None,
                created_at: Utc::now(),
            });
        }
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn get_order_sync(&self, id: Uuid) -> Option<Order> {
        self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned()
    }

    pub fn count_sold_sync(&self, event_id: Uuid) -> i64 {
        self.tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.event_id == event_id && t.status != TicketStatus::Cancelled)
            .count() as i64
    }
}

#[async_trait]
impl CatalogRepository for MemStore {
    async fn get_event(
        &self,
        id: Uuid,
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.events.lock().unwrap().get(&id).cloned())
    }

    async fn get_product(
        &self,
        id: Uuid,
    ) -> Result<Option<Product>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl OrderRepository for MemStore {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<CreateOrderOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(existing) = orders.iter().find(|o| o.external_id == order.external_id) {
            return Ok(CreateOrderOutcome {
                id: existing.id,
                created: false,
            });
        }
        orders.push(order.clone());
        Ok(CreateOrderOutcome {
            id: order.id,
            created: true,
        })
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.get_order_sync(id))
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.external_id == external_id)
            .cloned())
    }
}

#[async_trait]
impl TicketRepository for MemStore {
    async fn insert_ticket(
        &self,
        ticket: &Ticket,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tickets.lock().unwrap().push(ticket.clone());
        Ok(())
    }

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Ticket>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.code == code)
            .cloned())
    }

    async fn transition_status(
        &self,
        code: &str,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<Option<Ticket>, Box<dyn std::error::Error + Send + Sync>> {
        // Check and write under one lock, like the conditional UPDATE
        let mut tickets = self.tickets.lock().unwrap();
        match tickets
            .iter_mut()
            .find(|t| t.code == code && t.status == from)
        {
            Some(ticket) => {
                ticket.status = to;
                if to == TicketStatus::Used {
                    ticket.used_at = Some(Utc::now());
                }
                Ok(Some(ticket.clone()))
            }
            None => Ok(None),
        }
    }

    async fn count_sold(
        &self,
        event_id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.count_sold_sync(event_id))
    }

    async fn find_tickets(
        &self,
        lookup: &TicketLookup,
    ) -> Result<Vec<Ticket>, Box<dyn std::error::Error + Send + Sync>> {
        let tickets = self.tickets.lock().unwrap();
        let matching: Vec<Ticket> = match lookup {
            TicketLookup::Code(code) => tickets.iter().filter(|t| &t.code == code).cloned().collect(),
            TicketLookup::OrderId(order_id) => tickets
                .iter()
                .filter(|t| &t.order_id == order_id)
                .cloned()
                .collect(),
            TicketLookup::ExternalOrderId(external_id) => {
                let orders = self.orders.lock().unwrap();
                match orders.iter().find(|o| &o.external_id == external_id) {
                    Some(order) => tickets
                        .iter()
                        .filter(|t| t.order_id == order.id)
                        .cloned()
                        .collect(),
                    None => Vec::new(),
                }
            }
        };
        Ok(matching)
    }
}
