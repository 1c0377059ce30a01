use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use encore_catalog::ItemCategory;

use crate::models::CustomerInfo;

/// One server-priced line handed to the gateway at session creation.
/// `unit_amount` is in minor units, the gateway's native representation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i32,
    pub category: ItemCategory,
    pub catalog_ref: Option<Uuid>,
}

/// Where to send the customer to pay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRedirect {
    pub id: String,
    pub url: String,
}

/// A completed checkout session as re-retrieved from the gateway by id.
/// Amounts are converted back to decimal currency units.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    pub id: String,
    pub amount_total: f64,
    pub currency: String,
    pub customer: CustomerInfo,
}

/// A line item re-fetched from the gateway, with the catalog metadata the
/// session was created with. Never taken from the webhook body itself.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    pub name: String,
    pub category: ItemCategory,
    pub catalog_ref: Option<Uuid>,
    pub unit_price: f64,
    pub quantity: i32,
}

/// Client for the external payment gateway. The gateway is an opaque
/// service; only the two calls the fulfillment pipeline relies on are
/// modeled.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(
        &self,
        items: &[CreateSessionItem],
        customer: &CustomerInfo,
    ) -> Result<SessionRedirect, Box<dyn std::error::Error + Send + Sync>>;

    /// Expand a session to its full line-item detail. Called from the
    /// webhook handler with the session id from a verified payload.
    async fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Result<(GatewaySession, Vec<SessionLineItem>), Box<dyn std::error::Error + Send + Sync>>;
}
