pub mod gateway;
pub mod models;
pub mod repository;

pub use models::{
    CartItem, CustomerInfo, LineItem, Order, OrderStatus, Ticket, TicketStatus, TicketSummary,
};
pub use repository::{CatalogRepository, OrderRepository, TicketLookup, TicketRepository};
