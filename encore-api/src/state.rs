use std::sync::Arc;

use encore_core::gateway::PaymentGateway;
use encore_core::repository::{CatalogRepository, OrderRepository, TicketRepository};
use encore_notify::ConfirmationSender;
use encore_order::{OrderAssembler, TicketIssuer, TicketValidator};

#[derive(Clone)]
pub struct AppState {
    pub catalog_repo: Arc<dyn CatalogRepository>,
    pub order_repo: Arc<dyn OrderRepository>,
    pub ticket_repo: Arc<dyn TicketRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn ConfirmationSender>,
    pub assembler: Arc<OrderAssembler>,
    pub issuer: Arc<TicketIssuer>,
    pub validator: Arc<TicketValidator>,
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,
    pub currency: String,
}

impl AppState {
    /// Wire the pipeline components over a set of repositories. Repos are
    /// injected so tests can substitute the in-memory store.
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository>,
        order_repo: Arc<dyn OrderRepository>,
        ticket_repo: Arc<dyn TicketRepository>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn ConfirmationSender>,
        webhook_secret: String,
        currency: String,
    ) -> Self {
        let assembler = Arc::new(OrderAssembler::new(
            catalog_repo.clone(),
            order_repo.clone(),
            ticket_repo.clone(),
        ));
        let issuer = Arc::new(TicketIssuer::new(ticket_repo.clone()));
        let validator = Arc::new(TicketValidator::new(ticket_repo.clone()));

        Self {
            catalog_repo,
            order_repo,
            ticket_repo,
            gateway,
            mailer,
            assembler,
            issuer,
            validator,
            webhook_secret,
            currency,
        }
    }
}
