use async_trait::async_trait;
use uuid::Uuid;

use encore_catalog::ItemCategory;
use encore_core::gateway::{
    CreateSessionItem, GatewaySession, PaymentGateway, SessionLineItem, SessionRedirect,
};
use encore_core::models::CustomerInfo;
use encore_store::app_config::GatewayConfig;

/// Stripe-flavored checkout-session client. Catalog references and item
/// categories travel as product metadata on the session so the webhook
/// can map line items back without trusting its payload.
pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    currency: String,
    success_url: String,
    cancel_url: String,
}

impl StripeGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(
        &self,
        items: &[CreateSessionItem],
        customer: &CustomerInfo,
    ) -> Result<SessionRedirect, Box<dyn std::error::Error + Send + Sync>> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("customer_email".to_string(), customer.email.clone()),
            ("metadata[customer_name]".to_string(), customer.name.clone()),
            ("metadata[locale]".to_string(), customer.locale.clone()),
        ];

        for (i, item) in items.iter().enumerate() {
            params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
            params.push((
                format!("line_items[{i}][price_data][currency]"),
                self.currency.clone(),
            ));
            params.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            params.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            params.push((
                format!("line_items[{i}][price_data][product_data][metadata][category]"),
                item.category.as_str().to_string(),
            ));
            if let Some(catalog_ref) = item.catalog_ref {
                params.push((
                    format!("line_items[{i}][price_data][product_data][metadata][catalog_ref]"),
                    catalog_ref.to_string(),
                ));
            }
        }

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let id = body["id"]
            .as_str()
            .ok_or("gateway response missing session id")?
            .to_string();
        let url = body["url"]
            .as_str()
            .ok_or("gateway response missing redirect url")?
            .to_string();

        Ok(SessionRedirect { id, url })
    }

    async fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Result<(GatewaySession, Vec<SessionLineItem>), Box<dyn std::error::Error + Send + Sync>>
    {
        let response = self
            .http
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.api_base
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("expand[]", "line_items.data.price.product")])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;

        let session = GatewaySession {
            id: session_id.to_string(),
            amount_total: body["amount_total"].as_i64().unwrap_or(0) as f64 / 100.0,
            currency: body["currency"].as_str().unwrap_or("eur").to_string(),
            customer: CustomerInfo {
                name: body["metadata"]["customer_name"]
                    .as_str()
                    .or_else(|| body["customer_details"]["name"].as_str())
                    .unwrap_or("Unknown")
                    .to_string(),
                email: body["customer_details"]["email"]
                    .as_str()
                    .or_else(|| body["customer_email"].as_str())
                    .unwrap_or_default()
                    .to_string(),
                locale: body["metadata"]["locale"].as_str().unwrap_or("en").to_string(),
            },
        };

        let mut line_items = Vec::new();
        if let Some(items) = body["line_items"]["data"].as_array() {
            for item in items {
                let product = &item["price"]["product"];
                let category = product["metadata"]["category"]
                    .as_str()
                    .and_then(ItemCategory::parse)
                    .unwrap_or(ItemCategory::Merch);
                let catalog_ref = product["metadata"]["catalog_ref"]
                    .as_str()
                    .and_then(|s| Uuid::parse_str(s).ok());

                line_items.push(SessionLineItem {
                    name: product["name"]
                        .as_str()
                        .or_else(|| item["description"].as_str())
                        .unwrap_or("Unknown Item")
                        .to_string(),
                    category,
                    catalog_ref,
                    unit_price: item["price"]["unit_amount"].as_i64().unwrap_or(0) as f64 / 100.0,
                    quantity: item["quantity"].as_i64().unwrap_or(1) as i32,
                });
            }
        }

        Ok((session, line_items))
    }
}
