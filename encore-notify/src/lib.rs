//! Transactional order-confirmation email over SMTP.
//!
//! Delivery is best-effort by contract: by the time the dispatcher runs,
//! the order and any tickets are already durably committed, so callers
//! log a failure and move on rather than failing the checkout.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use encore_core::models::{Order, TicketSummary};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build email: {0}")]
    Build(String),

    #[error("smtp failure: {0}")]
    Transport(String),
}

/// Sends the confirmation email for a committed order.
#[async_trait]
pub trait ConfirmationSender: Send + Sync {
    async fn send_confirmation(
        &self,
        order: &Order,
        tickets: &[TicketSummary],
    ) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    smtp_server: String,
    smtp_port: u16,
    credentials: Credentials,
    from_email: String,
    from_name: String,
    storefront_base_url: String,
}

impl SmtpMailer {
    pub fn new(
        smtp_server: String,
        smtp_port: u16,
        smtp_username: String,
        smtp_password: String,
        from_email: String,
        from_name: String,
        storefront_base_url: String,
    ) -> Self {
        Self {
            smtp_server,
            smtp_port,
            credentials: Credentials::new(smtp_username, smtp_password),
            from_email,
            from_name,
            storefront_base_url,
        }
    }

    fn build_transport(&self) -> Result<SmtpTransport, NotifyError> {
        let transport = SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build();
        Ok(transport)
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// Itemized order table plus, when tickets exist, a retrieval link
    /// keyed by the order's external id.
    pub fn render_confirmation(&self, order: &Order, tickets: &[TicketSummary]) -> String {
        let currency = order.currency.to_uppercase();

        let mut rows = String::new();
        for item in &order.items {
            rows.push_str(&format!(
                r#"<tr>
    <td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td>
    <td style="padding: 8px; border-bottom: 1px solid #eee; text-align: center;">{}</td>
    <td style="padding: 8px; border-bottom: 1px solid #eee; text-align: right;">{:.2} {}</td>
    <td style="padding: 8px; border-bottom: 1px solid #eee; text-align: right;">{:.2} {}</td>
</tr>"#,
                item.name,
                item.quantity,
                item.unit_price,
                currency,
                item.line_total(),
                currency,
            ));
        }

        let ticket_block = if tickets.is_empty() {
            String::new()
        } else {
            let link = format!(
                "{}/{}/tickets?order={}",
                self.storefront_base_url, order.locale, order.external_id
            );
            let mut codes = String::new();
            for ticket in tickets {
                codes.push_str(&format!(
                    "<li>{} — {}</li>",
                    ticket.event_name, ticket.code
                ));
            }
            format!(
                r#"<h3>Your tickets</h3>
<ul>{codes}</ul>
<p style="margin: 30px 0;">
    <a href="{link}"
       style="display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
        View your tickets
    </a>
</p>"#
            )
        };

        format!(
            r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Order confirmation</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Thank you for your order, {name}!</h2>
        <p>Order reference: {reference}</p>
        <table style="width: 100%; border-collapse: collapse;">
            <tr>
                <th style="text-align: left; padding: 8px;">Item</th>
                <th style="padding: 8px;">Qty</th>
                <th style="text-align: right; padding: 8px;">Unit</th>
                <th style="text-align: right; padding: 8px;">Total</th>
            </tr>
            {rows}
        </table>
        <p style="text-align: right; font-weight: bold;">Order total: {total:.2} {currency}</p>
        {ticket_block}
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            If you have any questions, just reply to this email.
        </p>
    </div>
</body>
</html>
            "#,
            name = order.customer_name,
            reference = order.external_id,
            rows = rows,
            total = order.amount,
            currency = currency,
            ticket_block = ticket_block,
        )
    }
}

#[async_trait]
impl ConfirmationSender for SmtpMailer {
    async fn send_confirmation(
        &self,
        order: &Order,
        tickets: &[TicketSummary],
    ) -> Result<(), NotifyError> {
        let html_body = self.render_confirmation(order, tickets);

        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| NotifyError::Address(format!("invalid from address: {e}")))?,
            )
            .to(order
                .customer_email
                .parse()
                .map_err(|e| NotifyError::Address(format!("invalid to address: {e}")))?)
            .subject(format!("Order confirmation — {}", order.external_id))
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| NotifyError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| NotifyError::Transport(format!("email task failed: {e}")))?
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_catalog::ItemCategory;
    use encore_core::models::{CustomerInfo, LineItem, Order};

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(
            "localhost".to_string(),
            587,
            "user".to_string(),
            "pass".to_string(),
            "orders@example.com".to_string(),
            "Encore Store".to_string(),
            "https://shop.example.com".to_string(),
        )
    }

    fn order() -> Order {
        let customer = CustomerInfo {
            name: "Jo Doe".to_string(),
            email: "jo@example.com".to_string(),
            locale: "fr".to_string(),
        };
        Order::free(
            &customer,
            vec![LineItem {
                name: "Release Show".to_string(),
                category: ItemCategory::Event,
                unit_price: 0.0,
                quantity: 2,
                catalog_ref: None,
            }],
            "eur",
        )
    }

    #[test]
    fn test_render_lists_items_and_total() {
        let order = order();
        let html = mailer().render_confirmation(&order, &[]);
        assert!(html.contains("Release Show"));
        assert!(html.contains("Order total: 0.00 EUR"));
        assert!(html.contains(&order.external_id));
        assert!(!html.contains("View your tickets"));
    }

    #[test]
    fn test_render_includes_retrieval_link_when_tickets_exist() {
        let order = order();
        let tickets = vec![TicketSummary {
            code: "TKT-ABC123".to_string(),
            event_name: "Release Show".to_string(),
            attendee_name: "Jo Doe".to_string(),
        }];
        let html = mailer().render_confirmation(&order, &tickets);
        assert!(html.contains("TKT-ABC123"));
        assert!(html.contains(&format!(
            "https://shop.example.com/fr/tickets?order={}",
            order.external_id
        )));
    }
}
