use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use encore_catalog::ItemCategory;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Cancelled,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "shipped" => Some(OrderStatus::Shipped),
            "cancelled" => Some(OrderStatus::Cancelled),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

/// Ticket status. Monotonic: active -> used or active -> cancelled,
/// never back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Used,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Used => "used",
            TicketStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TicketStatus::Active),
            "used" => Some(TicketStatus::Used),
            "cancelled" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }
}

/// A cart entry as submitted by the storefront client. Carries only a
/// catalog reference and a quantity — price and title are always
/// re-fetched server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub category: ItemCategory,
    pub catalog_ref: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub locale: String,
}

/// A purchased line within an order. `unit_price` is frozen at creation:
/// later catalog price changes never touch historical orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub category: ItemCategory,
    pub unit_price: f64,
    pub quantity: i32,
    pub catalog_ref: Option<Uuid>,
}

impl LineItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// The single source of truth for a customer's purchase.
///
/// `external_id` is the gateway checkout-session id for paid orders and a
/// synthetic `free_<id>` for free ones; it is unique in the store, which
/// also makes retried webhook deliveries idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub external_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub amount: f64,
    pub currency: String,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub locale: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// A zero-amount order completed synchronously, no gateway involved.
    /// The amount is always the server-computed line total.
    pub fn free(customer: &CustomerInfo, items: Vec<LineItem>, currency: &str) -> Self {
        let amount = items.iter().map(LineItem::line_total).sum();
        Self {
            id: Uuid::new_v4(),
            external_id: format!("free_{}", Uuid::new_v4().simple()),
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            amount,
            currency: currency.to_string(),
            status: OrderStatus::Completed,
            items,
            locale: customer.locale.clone(),
            created_at: Utc::now(),
        }
    }

    /// An order created from a verified, completed gateway session. The
    /// gateway's charged amount is authoritative here — price validation
    /// already happened when the session was created.
    pub fn paid(
        session_id: &str,
        customer: &CustomerInfo,
        items: Vec<LineItem>,
        amount: f64,
        currency: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: session_id.to_string(),
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            amount,
            currency: currency.to_string(),
            status: OrderStatus::Paid,
            items,
            locale: customer.locale.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn calculated_total(&self) -> f64 {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

/// One admission to one event, bound to the order that bought it.
/// `code` is the only value a door scanner needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub code: String,
    pub status: TicketStatus,
    pub event_id: Uuid,
    pub event_name: String,
    pub order_id: Uuid,
    pub attendee_name: String,
    pub attendee_email: String,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Mint a fresh ticket for one unit of an event line item. Attendee
    /// identity is copied from the order at issuance; gifted tickets may
    /// diverge later but currently always match the buyer.
    pub fn issue(order: &Order, event_id: Uuid, event_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: format!("TKT-{}", Uuid::new_v4().simple().to_string().to_uppercase()),
            status: TicketStatus::Active,
            event_id,
            event_name: event_name.to_string(),
            order_id: order.id,
            attendee_name: order.customer_name.clone(),
            attendee_email: order.customer_email.clone(),
            used_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> TicketSummary {
        TicketSummary {
            code: self.code.clone(),
            event_name: self.event_name.clone(),
            attendee_name: self.attendee_name.clone(),
        }
    }
}

/// What the confirmation email needs to know about an issued ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSummary {
    pub code: String,
    pub event_name: String,
    pub attendee_name: String,
}
