use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use encore_core::models::{Ticket, TicketStatus};
use encore_core::repository::{TicketLookup, TicketRepository};

const TICKET_COLUMNS: &str = "id, code, status, event_id, event_name, order_id, attendee_name, \
                              attendee_email, used_at, created_at";

pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, Box<dyn std::error::Error + Send + Sync>> {
    let status_str: String = row.try_get("status")?;
    let status = TicketStatus::parse(&status_str)
        .ok_or_else(|| format!("unknown ticket status: {status_str}"))?;

    Ok(Ticket {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        status,
        event_id: row.try_get("event_id")?,
        event_name: row.try_get("event_name")?,
        order_id: row.try_get("order_id")?,
        attendee_name: row.try_get("attendee_name")?,
        attendee_email: row.try_get("attendee_email")?,
        used_at: row.try_get("used_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn insert_ticket(
        &self,
        ticket: &Ticket,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO tickets \
             (id, code, status, event_id, event_name, order_id, attendee_name, attendee_email, used_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(ticket.id)
        .bind(&ticket.code)
        .bind(ticket.status.as_str())
        .bind(ticket.event_id)
        .bind(&ticket.event_name)
        .bind(ticket.order_id)
        .bind(&ticket.attendee_name)
        .bind(&ticket.attendee_email)
        .bind(ticket.used_at)
        .bind(ticket.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Ticket>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(ticket_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn transition_status(
        &self,
        code: &str,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<Option<Ticket>, Box<dyn std::error::Error + Send + Sync>> {
        // One conditional write: the WHERE clause is the compare half of
        // the compare-and-set, so two concurrent scans cannot both match.
        let row = sqlx::query(&format!(
            "UPDATE tickets \
             SET status = $3, used_at = CASE WHEN $3 = 'used' THEN NOW() ELSE used_at END \
             WHERE code = $1 AND status = $2 \
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(code)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(ticket_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn count_sold(
        &self,
        event_id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS sold FROM tickets WHERE event_id = $1 AND status <> 'cancelled'",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("sold")?)
    }

    async fn find_tickets(
        &self,
        lookup: &TicketLookup,
    ) -> Result<Vec<Ticket>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = match lookup {
            TicketLookup::Code(code) => {
                sqlx::query(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE code = $1"
                ))
                .bind(code)
                .fetch_all(&self.pool)
                .await?
            }
            TicketLookup::OrderId(order_id) => {
                sqlx::query(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = $1 ORDER BY created_at"
                ))
                .bind(order_id)
                .fetch_all(&self.pool)
                .await?
            }
            TicketLookup::ExternalOrderId(external_id) => {
                sqlx::query(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets \
                     WHERE order_id IN (SELECT id FROM orders WHERE external_id = $1) \
                     ORDER BY created_at"
                ))
                .bind(external_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut tickets = Vec::with_capacity(rows.len());
        for row in rows {
            tickets.push(ticket_from_row(&row)?);
        }
        Ok(tickets)
    }
}
