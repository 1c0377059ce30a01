use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use encore_catalog::{Event, ItemCategory, PricingTier, Product};
use encore_core::repository::CatalogRepository;

/// Postgres-backed reads over the catalog tables kept in sync from the
/// CMS. Tiers are stored as a JSONB array to preserve their order.
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn get_event(
        &self,
        id: Uuid,
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(
            "SELECT id, title, starts_at, location, base_price, tiers FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tiers_value: serde_json::Value = row.try_get("tiers")?;
        let tiers: Vec<PricingTier> = serde_json::from_value(tiers_value)?;

        Ok(Some(Event {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            starts_at: row.try_get("starts_at")?,
            location: row.try_get("location")?,
            base_price: row.try_get("base_price")?,
            tiers,
        }))
    }

    async fn get_product(
        &self,
        id: Uuid,
    ) -> Result<Option<Product>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(
            "SELECT id, name, category, price, is_active FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let category_str: String = row.try_get("category")?;
        let category = ItemCategory::parse(&category_str)
            .ok_or_else(|| format!("unknown product category: {category_str}"))?;

        Ok(Some(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category,
            price: row.try_get("price")?,
            is_active: row.try_get("is_active")?,
        }))
    }
}
