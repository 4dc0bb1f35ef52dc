//! Rarity tier table.
//!
//! Builds ordered tiers from raw weight configuration. Tiers are sorted by
//! descending weight, so rank 1 is the most common tier. Rank 0 is reserved
//! as the "unknown" rank and never appears in a built table; an item that
//! matches no tier is a configuration error and surfaces as
//! [`RarityError::UnknownItem`] rather than a silent fallback.

use crate::config::RarityConfig;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RarityError {
    #[error("item '{0}' matches no rarity tier")]
    UnknownItem(String),

    #[error("item '{item}' appears in both '{first}' and '{second}'")]
    DuplicateItem {
        item: String,
        first: String,
        second: String,
    },

    #[error("tier '{tier}' has non-positive weight {weight}")]
    BadWeight { tier: String, weight: f64 },
}

/// One rarity bracket: a weight, a rank, and its member items.
#[derive(Debug, Clone, PartialEq)]
pub struct RarityTier {
    /// Tier key from configuration (e.g. "common").
    pub key: String,

    /// 1-based rank, 1 = most common.
    pub rank: u16,

    pub weight: f64,

    /// Whether the tier participates in the base draw pool.
    pub from_daily: bool,

    /// Member item IDs, in configured order.
    pub items: Vec<String>,
}

/// Ordered rarity tiers with rank lookup.
#[derive(Debug, Clone)]
pub struct RarityTable {
    tiers: Vec<RarityTier>,
}

impl RarityTable {
    /// Build the table from raw configuration.
    ///
    /// Validates that weights are positive and that no item ID appears in
    /// more than one tier. Ties in weight are broken by tier key so rank
    /// assignment is stable across runs.
    pub fn from_config(rarities: &HashMap<String, RarityConfig>) -> Result<Self, RarityError> {
        let mut ordered: Vec<(&String, &RarityConfig)> = rarities.iter().collect();
        ordered.sort_by(|a, b| {
            b.1.weight
                .partial_cmp(&a.1.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut tiers = Vec::with_capacity(ordered.len());

        for (idx, (key, cfg)) in ordered.into_iter().enumerate() {
            if !(cfg.weight > 0.0) {
                return Err(RarityError::BadWeight {
                    tier: key.clone(),
                    weight: cfg.weight,
                });
            }

            for item in &cfg.items {
                if let Some(first) = seen.insert(item, key) {
                    return Err(RarityError::DuplicateItem {
                        item: item.clone(),
                        first: first.to_string(),
                        second: key.clone(),
                    });
                }
            }

            tiers.push(RarityTier {
                key: key.clone(),
                rank: (idx + 1) as u16,
                weight: cfg.weight,
                from_daily: cfg.from_daily,
                items: cfg.items.clone(),
            });
        }

        Ok(RarityTable { tiers })
    }

    /// All tiers in rank order.
    pub fn tiers(&self) -> &[RarityTier] {
        &self.tiers
    }

    /// Look up the tier at a given rank.
    pub fn tier_by_rank(&self, rank: u16) -> Option<&RarityTier> {
        self.tiers.iter().find(|t| t.rank == rank)
    }

    /// Find the tier containing an item, scanning in rank order.
    ///
    /// An item in no tier means the item and rarity configuration disagree;
    /// this is logged and returned as an error so callers can't mistake it
    /// for a normal draw result.
    pub fn find_rarity(&self, item_id: &str) -> Result<&RarityTier, RarityError> {
        match self
            .tiers
            .iter()
            .find(|t| t.items.iter().any(|i| i == item_id))
        {
            Some(tier) => Ok(tier),
            None => {
                tracing::warn!(item_id, "item matches no rarity tier");
                Err(RarityError::UnknownItem(item_id.to_string()))
            }
        }
    }

    /// Base draw weights by rank.
    ///
    /// Tiers excluded from the daily pool keep their rank but contribute
    /// weight 0, so they exist in the table yet can never be drawn from the
    /// base pool.
    pub fn base_weights(&self) -> HashMap<u16, f64> {
        self.tiers
            .iter()
            .map(|t| (t.rank, if t.from_daily { t.weight } else { 0.0 }))
            .collect()
    }
}
