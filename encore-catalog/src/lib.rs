pub mod models;
pub mod pricing;

pub use models::{Event, ItemCategory, PricingTier, Product};
pub use pricing::resolve_price;
