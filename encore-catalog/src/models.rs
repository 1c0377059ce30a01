use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Categories of items sold by the storefront
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Event,
    Merch,
    AlbumPhysical,
    AlbumDigital,
    Track,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Event => "event",
            ItemCategory::Merch => "merch",
            ItemCategory::AlbumPhysical => "album_physical",
            ItemCategory::AlbumDigital => "album_digital",
            ItemCategory::Track => "track",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "event" => Some(ItemCategory::Event),
            "merch" => Some(ItemCategory::Merch),
            "album_physical" => Some(ItemCategory::AlbumPhysical),
            "album_digital" => Some(ItemCategory::AlbumDigital),
            "track" => Some(ItemCategory::Track),
            _ => None,
        }
    }
}

/// A time/quantity-bounded price on an event.
///
/// Tier order in the catalog is significant: the resolver walks the list
/// top to bottom and the first matching tier wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTier {
    pub name: String,
    pub price: f64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ticket_limit: Option<i64>,
}

/// A ticketed event. Owned by the CMS, read-only from the engine's side.
/// Sold-count is derived from the ticket store, not a column here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub base_price: f64,
    pub tiers: Vec<PricingTier>,
}

/// A non-event catalog item (merch, albums, tracks)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: ItemCategory,
    pub price: f64,
    pub is_active: bool,
}
