use chrono::{DateTime, Utc};

use crate::models::PricingTier;

/// Resolve the price to charge for one event ticket right now.
///
/// Walks `tiers` in catalog order; a tier matches iff every bound it
/// actually defines holds (`now >= starts_at`, `now < ends_at`,
/// `sold_count < ticket_limit`). The first match wins — this is a
/// first-match-wins policy, not best-price. No match falls back to
/// `base_price`.
pub fn resolve_price(
    base_price: f64,
    tiers: &[PricingTier],
    sold_count: i64,
    now: DateTime<Utc>,
) -> f64 {
    for tier in tiers {
        if tier_matches(tier, sold_count, now) {
            return tier.price;
        }
    }
    base_price
}

fn tier_matches(tier: &PricingTier, sold_count: i64, now: DateTime<Utc>) -> bool {
    if let Some(starts_at) = tier.starts_at {
        if now < starts_at {
            return false;
        }
    }
    if let Some(ends_at) = tier.ends_at {
        if now >= ends_at {
            return false;
        }
    }
    if let Some(limit) = tier.ticket_limit {
        if sold_count >= limit {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tier(name: &str, price: f64) -> PricingTier {
        PricingTier {
            name: name.to_string(),
            price,
            starts_at: None,
            ends_at: None,
            ticket_limit: None,
        }
    }

    #[test]
    fn test_empty_tier_list_falls_back_to_base_price() {
        assert_eq!(resolve_price(20.0, &[], 0, Utc::now()), 20.0);
    }

    #[test]
    fn test_first_matching_tier_wins() {
        let now = Utc::now();
        let tiers = vec![
            PricingTier {
                ends_at: Some(now + Duration::days(7)),
                ticket_limit: Some(50),
                ..tier("Early", 10.0)
            },
            tier("Late", 15.0),
        ];

        // Under the limit and before the deadline: early bird price
        assert_eq!(resolve_price(20.0, &tiers, 40, now), 10.0);
    }

    #[test]
    fn test_exhausted_limit_falls_through_to_next_tier() {
        let now = Utc::now();
        let tiers = vec![
            PricingTier {
                ends_at: Some(now + Duration::days(7)),
                ticket_limit: Some(50),
                ..tier("Early", 10.0)
            },
            tier("Late", 15.0),
        ];

        assert_eq!(resolve_price(20.0, &tiers, 55, now), 15.0);
    }

    #[test]
    fn test_expired_tier_falls_through() {
        let now = Utc::now();
        let tiers = vec![PricingTier {
            ends_at: Some(now - Duration::hours(1)),
            ..tier("Early", 10.0)
        }];

        assert_eq!(resolve_price(20.0, &tiers, 0, now), 20.0);
    }

    #[test]
    fn test_tier_not_yet_started_falls_through() {
        let now = Utc::now();
        let tiers = vec![
            PricingTier {
                starts_at: Some(now + Duration::days(1)),
                ..tier("Door", 25.0)
            },
            tier("Presale", 18.0),
        ];

        assert_eq!(resolve_price(20.0, &tiers, 0, now), 18.0);
    }

    #[test]
    fn test_tier_order_is_significant_not_best_price() {
        let now = Utc::now();
        // A cheaper tier further down the list must not shadow an earlier match
        let tiers = vec![tier("Standard", 15.0), tier("Cheap", 5.0)];

        assert_eq!(resolve_price(20.0, &tiers, 0, now), 15.0);
    }

    #[test]
    fn test_zero_price_vip_tier_under_limit() {
        let now = Utc::now();
        let tiers = vec![PricingTier {
            ticket_limit: Some(5),
            ..tier("VIP", 0.0)
        }];

        assert_eq!(resolve_price(20.0, &tiers, 3, now), 0.0);
        assert_eq!(resolve_price(20.0, &tiers, 5, now), 20.0);
    }
}
