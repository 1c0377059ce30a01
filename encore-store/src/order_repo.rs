use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use encore_catalog::ItemCategory;
use encore_core::models::{LineItem, Order, OrderStatus};
use encore_core::repository::{CreateOrderOutcome, OrderRepository};

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<LineItem>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query(
            "SELECT name, category, unit_price, quantity, catalog_ref \
             FROM order_items WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(line_item_from_row(&row)?);
        }
        Ok(items)
    }
}

fn line_item_from_row(row: &PgRow) -> Result<LineItem, Box<dyn std::error::Error + Send + Sync>> {
    let category_str: String = row.try_get("category")?;
    let category = ItemCategory::parse(&category_str)
        .ok_or_else(|| format!("unknown item category: {category_str}"))?;

    Ok(LineItem {
        name: row.try_get("name")?,
        category,
        unit_price: row.try_get("unit_price")?,
        quantity: row.try_get("quantity")?,
        catalog_ref: row.try_get("catalog_ref")?,
    })
}

fn order_from_row(
    row: &PgRow,
    items: Vec<LineItem>,
) -> Result<Order, Box<dyn std::error::Error + Send + Sync>> {
    let status_str: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_str)
        .ok_or_else(|| format!("unknown order status: {status_str}"))?;

    Ok(Order {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        status,
        items,
        locale: row.try_get("locale")?,
        created_at: row.try_get("created_at")?,
    })
}

const ORDER_COLUMNS: &str = "id, external_id, customer_name, customer_email, amount, currency, \
                             status, locale, created_at";

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<CreateOrderOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO orders \
             (id, external_id, customer_name, customer_email, amount, currency, status, locale, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (external_id) DO NOTHING",
        )
        .bind(order.id)
        .bind(&order.external_id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(order.amount)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(&order.locale)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // A retried webhook delivery: hand back the winning row
            tx.rollback().await?;
            let row = sqlx::query("SELECT id FROM orders WHERE external_id = $1")
                .bind(&order.external_id)
                .fetch_one(&self.pool)
                .await?;
            return Ok(CreateOrderOutcome {
                id: row.try_get("id")?,
                created: false,
            });
        }

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items \
                 (id, order_id, name, category, unit_price, quantity, catalog_ref) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(order.id)
            .bind(&item.name)
            .bind(item.category.as_str())
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.catalog_ref)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(CreateOrderOutcome {
            id: order.id,
            created: true,
        })
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = self.load_items(id).await?;
        Ok(Some(order_from_row(&row, items)?))
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: Uuid = row.try_get("id")?;
        let items = self.load_items(id).await?;
        Ok(Some(order_from_row(&row, items)?))
    }
}
