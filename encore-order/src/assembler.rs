use std::sync::Arc;

use chrono::Utc;
use encore_catalog::{resolve_price, ItemCategory};
use encore_core::gateway::{GatewaySession, SessionLineItem};
use encore_core::models::{CartItem, CustomerInfo, LineItem, Order};
use encore_core::repository::{CatalogRepository, OrderRepository, TicketRepository};

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid quantity {quantity}")]
    InvalidQuantity { quantity: i32 },

    #[error("cart total {calculated} does not qualify for free checkout")]
    PriceMismatch { calculated: f64 },

    #[error("store error: {0}")]
    Store(String),
}

/// Builds persisted orders from carts, re-pricing everything against the
/// authoritative catalog. Client-submitted prices and titles are never
/// trusted.
pub struct OrderAssembler {
    catalog: Arc<dyn CatalogRepository>,
    orders: Arc<dyn OrderRepository>,
    tickets: Arc<dyn TicketRepository>,
}

impl OrderAssembler {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        orders: Arc<dyn OrderRepository>,
        tickets: Arc<dyn TicketRepository>,
    ) -> Self {
        Self {
            catalog,
            orders,
            tickets,
        }
    }

    /// Re-fetch every cart item server-side and compute its current
    /// price. Events re-run tier resolution against a freshly queried
    /// sold-count. A failed catalog lookup degrades the item to price
    /// zero rather than aborting the whole checkout.
    ///
    /// Quantities must be at least 1: a negative line could offset
    /// priced items to a zero total and slip past the free-checkout
    /// gate.
    pub async fn price_cart(&self, items: &[CartItem]) -> Result<Vec<LineItem>, CheckoutError> {
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            if item.quantity < 1 {
                return Err(CheckoutError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
            let line = match item.category {
                ItemCategory::Event => self.price_event_item(item).await?,
                _ => self.price_product_item(item).await?,
            };
            lines.push(line);
        }

        Ok(lines)
    }

    async fn price_event_item(&self, item: &CartItem) -> Result<LineItem, CheckoutError> {
        let event = self
            .catalog
            .get_event(item.catalog_ref)
            .await
            .map_err(|e| CheckoutError::Store(e.to_string()))?;

        let Some(event) = event else {
            tracing::warn!(
                catalog_ref = %item.catalog_ref,
                "event lookup failed during checkout, falling back to price 0"
            );
            return Ok(fallback_line(item));
        };

        let sold = self
            .tickets
            .count_sold(event.id)
            .await
            .map_err(|e| CheckoutError::Store(e.to_string()))?;
        let price = resolve_price(event.base_price, &event.tiers, sold, Utc::now());

        Ok(LineItem {
            name: event.title,
            category: ItemCategory::Event,
            unit_price: price,
            quantity: item.quantity,
            catalog_ref: Some(event.id),
        })
    }

    async fn price_product_item(&self, item: &CartItem) -> Result<LineItem, CheckoutError> {
        let product = self
            .catalog
            .get_product(item.catalog_ref)
            .await
            .map_err(|e| CheckoutError::Store(e.to_string()))?;

        let Some(product) = product else {
            tracing::warn!(
                catalog_ref = %item.catalog_ref,
                "product lookup failed during checkout, falling back to price 0"
            );
            return Ok(fallback_line(item));
        };

        Ok(LineItem {
            name: product.name,
            category: product.category,
            unit_price: product.price,
            quantity: item.quantity,
            catalog_ref: Some(product.id),
        })
    }

    /// Synchronous zero-amount checkout. Rejects outright when the
    /// server-recomputed total is anything but zero — a client cannot
    /// forge a free cart for priced items.
    pub async fn assemble_free(
        &self,
        items: &[CartItem],
        customer: &CustomerInfo,
        currency: &str,
    ) -> Result<Order, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let lines = self.price_cart(items).await?;
        let calculated: f64 = lines.iter().map(LineItem::line_total).sum();
        if calculated != 0.0 {
            return Err(CheckoutError::PriceMismatch { calculated });
        }

        let order = Order::free(customer, lines, currency);
        let outcome = self
            .orders
            .create_order(&order)
            .await
            .map_err(|e| CheckoutError::Store(e.to_string()))?;

        tracing::info!(order_id = %outcome.id, "free order completed");
        Ok(order)
    }

    /// Webhook-driven flow for a verified, completed session. The
    /// gateway's charged amount is authoritative; the unique external id
    /// makes a retried delivery return the already-created order with
    /// `created: false`.
    pub async fn assemble_paid(
        &self,
        session: &GatewaySession,
        line_items: Vec<SessionLineItem>,
    ) -> Result<(Order, bool), CheckoutError> {
        let lines: Vec<LineItem> = line_items
            .into_iter()
            .map(|li| LineItem {
                name: li.name,
                category: li.category,
                unit_price: li.unit_price,
                quantity: li.quantity,
                catalog_ref: li.catalog_ref,
            })
            .collect();

        let order = Order::paid(
            &session.id,
            &session.customer,
            lines,
            session.amount_total,
            &session.currency,
        );

        let outcome = self
            .orders
            .create_order(&order)
            .await
            .map_err(|e| CheckoutError::Store(e.to_string()))?;

        if !outcome.created {
            tracing::info!(session_id = %session.id, "duplicate webhook delivery, order already exists");
            let existing = self
                .orders
                .get_order(outcome.id)
                .await
                .map_err(|e| CheckoutError::Store(e.to_string()))?
                .ok_or_else(|| CheckoutError::Store("order vanished after upsert".to_string()))?;
            return Ok((existing, false));
        }

        tracing::info!(order_id = %order.id, session_id = %session.id, "paid order created");
        Ok((order, true))
    }
}

fn fallback_line(item: &CartItem) -> LineItem {
    LineItem {
        name: "Unknown item".to_string(),
        category: item.category,
        unit_price: 0.0,
        quantity: item.quantity,
        catalog_ref: Some(item.catalog_ref),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_catalog::{Event, PricingTier, Product};
    use encore_store::mem::MemStore;
    use uuid::Uuid;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Jo Doe".to_string(),
            email: "jo@example.com".to_string(),
            locale: "en".to_string(),
        }
    }

    fn assembler(store: &Arc<MemStore>) -> OrderAssembler {
        OrderAssembler::new(store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let store = Arc::new(MemStore::new());
        let result = assembler(&store)
            .assemble_free(&[], &customer(), "eur")
            .await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_priced_cart_cannot_check_out_free() {
        let store = Arc::new(MemStore::new());
        let product = Product {
            id: Uuid::new_v4(),
            name: "Tour Shirt".to_string(),
            category: ItemCategory::Merch,
            price: 25.0,
            is_active: true,
        };
        store.seed_product(product.clone());

        let cart = vec![CartItem {
            category: ItemCategory::Merch,
            catalog_ref: product.id,
            quantity: 1,
        }];
        let result = assembler(&store)
            .assemble_free(&cart, &customer(), "eur")
            .await;

        match result {
            Err(CheckoutError::PriceMismatch { calculated }) => assert_eq!(calculated, 25.0),
            other => panic!("expected price mismatch, got {other:?}"),
        }
        // No order document may exist after a rejection
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_negative_quantity_cannot_offset_priced_items() {
        let store = Arc::new(MemStore::new());
        let event = Event {
            id: Uuid::new_v4(),
            title: "Release Show".to_string(),
            starts_at: Utc::now(),
            location: None,
            base_price: 20.0,
            tiers: vec![],
        };
        let product = Product {
            id: Uuid::new_v4(),
            name: "Tour Shirt".to_string(),
            category: ItemCategory::Merch,
            price: 10.0,
            is_active: true,
        };
        store.seed_event(event.clone());
        store.seed_product(product.clone());

        // 2 x 20.00 offset by -4 x 10.00 sums to exactly zero
        let cart = vec![
            CartItem {
                category: ItemCategory::Event,
                catalog_ref: event.id,
                quantity: 2,
            },
            CartItem {
                category: ItemCategory::Merch,
                catalog_ref: product.id,
                quantity: -4,
            },
        ];
        let result = assembler(&store)
            .assemble_free(&cart, &customer(), "eur")
            .await;

        match result {
            Err(CheckoutError::InvalidQuantity { quantity }) => assert_eq!(quantity, -4),
            other => panic!("expected invalid quantity, got {other:?}"),
        }
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected() {
        let store = Arc::new(MemStore::new());
        let cart = vec![CartItem {
            category: ItemCategory::Merch,
            catalog_ref: Uuid::new_v4(),
            quantity: 0,
        }];
        let result = assembler(&store)
            .assemble_free(&cart, &customer(), "eur")
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[tokio::test]
    async fn test_zero_tier_event_checks_out_free() {
        let store = Arc::new(MemStore::new());
        let event = Event {
            id: Uuid::new_v4(),
            title: "Release Show".to_string(),
            starts_at: Utc::now(),
            location: None,
            base_price: 20.0,
            tiers: vec![PricingTier {
                name: "VIP".to_string(),
                price: 0.0,
                starts_at: None,
                ends_at: None,
                ticket_limit: Some(5),
            }],
        };
        store.seed_event(event.clone());
        store.seed_sold_count(event.id, 3);

        let cart = vec![CartItem {
            category: ItemCategory::Event,
            catalog_ref: event.id,
            quantity: 2,
        }];
        let order = assembler(&store)
            .assemble_free(&cart, &customer(), "eur")
            .await
            .unwrap();

        assert_eq!(order.amount, 0.0);
        assert_eq!(order.status, encore_core::OrderStatus::Completed);
        assert_eq!(order.items[0].unit_price, 0.0);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_catalog_ref_degrades_to_zero() {
        let store = Arc::new(MemStore::new());
        let cart = vec![CartItem {
            category: ItemCategory::Track,
            catalog_ref: Uuid::new_v4(),
            quantity: 1,
        }];

        // Lookup failure degrades to price 0, so the free path accepts it
        let order = assembler(&store)
            .assemble_free(&cart, &customer(), "eur")
            .await
            .unwrap();
        assert_eq!(order.amount, 0.0);
    }

    #[tokio::test]
    async fn test_duplicate_session_creates_one_order() {
        let store = Arc::new(MemStore::new());
        let session = GatewaySession {
            id: "cs_test_abc".to_string(),
            amount_total: 40.0,
            currency: "eur".to_string(),
            customer: customer(),
        };
        let items = vec![SessionLineItem {
            name: "Release Show".to_string(),
            category: ItemCategory::Event,
            catalog_ref: Some(Uuid::new_v4()),
            unit_price: 20.0,
            quantity: 2,
        }];

        let asm = assembler(&store);
        let (first, created) = asm
            .assemble_paid(&session, items.clone())
            .await
            .unwrap();
        assert!(created);

        let (second, created_again) = asm.assemble_paid(&session, items).await.unwrap();
        assert!(!created_again);
        assert_eq!(first.id, second.id);
        assert_eq!(store.order_count(), 1);
    }
}
