//! User profile record.
//!
//! Profiles are owned by an external user-data component; this crate reads
//! them to recompute leaderboards and writes them when market
//! reconciliation credits compensation. Maps are ordered so serialized
//! profiles are byte-stable.

use crate::config::ItemDef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One user's mutable game record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub score: u64,

    /// Item ID -> number collected.
    #[serde(default)]
    pub collection: BTreeMap<String, u64>,

    #[serde(default)]
    pub streak: u64,

    #[serde(default)]
    pub attempts: u64,

    #[serde(default)]
    pub top_attempts: u64,

    #[serde(default)]
    pub gifts_used: u64,

    /// Base multiplier before boost stacks are applied.
    #[serde(default)]
    pub multiplier: u64,

    /// Number of currently active temporary boost stacks.
    #[serde(default)]
    pub boosts: u32,

    /// Best completion time in milliseconds. 0 = no completion yet.
    #[serde(default)]
    pub fastest_time_ms: u64,

    /// Powerup ID -> units held.
    #[serde(default)]
    pub powerups: BTreeMap<String, u64>,
}

impl UserProfile {
    /// Total items collected across the whole collection.
    pub fn total_items(&self) -> u64 {
        self.collection.values().sum()
    }

    /// Distinct items held, split into (normal, sb) by the item flag.
    pub fn unique_counts(&self, items: &HashMap<String, ItemDef>) -> (u64, u64) {
        let mut normal = 0;
        let mut sb = 0;
        for (id, count) in &self.collection {
            if *count == 0 {
                continue;
            }
            let flags = items.get(id).cloned().unwrap_or_default();
            if flags.sb_only {
                sb += 1;
            } else {
                normal += 1;
            }
        }
        (normal, sb)
    }

    /// Effective multiplier after boost stacks.
    ///
    /// Each stack adds `min(ceil(current * 0.05), cap)` where `current` is
    /// the value after the previous stack, so stacks compound rather than
    /// all reading the base value.
    pub fn boosted_multiplier(&self, cap: u64) -> u64 {
        let mut value = self.multiplier;
        for _ in 0..self.boosts {
            value += value.div_ceil(20).min(cap);
        }
        value
    }

    /// Apply a market compensation credit.
    pub fn credit(&mut self, powerup_id: &str, units: u64, score: u64) {
        if units > 0 {
            *self.powerups.entry(powerup_id.to_string()).or_insert(0) += units;
        }
        self.score += score;
    }
}
