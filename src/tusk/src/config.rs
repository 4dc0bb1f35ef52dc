//! Parsed game configuration.
//!
//! The configuration loader itself lives outside this crate; these are the
//! already-parsed objects the core consumes. Everything is validated up
//! front (see [`crate::rarity::RarityTable::from_config`]) so the draw and
//! store paths never have to re-check shape at point of use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw weight configuration for one rarity tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RarityConfig {
    /// Draw weight relative to the other tiers. Must be positive.
    pub weight: f64,

    /// Whether this tier is part of the base (daily) draw pool.
    #[serde(default = "default_true")]
    pub from_daily: bool,

    /// Item IDs belonging to this tier, in display order.
    #[serde(default)]
    pub items: Vec<String>,
}

/// Per-item eligibility flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDef {
    /// Blacklisted items are never drawable.
    #[serde(default)]
    pub blacklisted: bool,

    /// SB items are only drawable in guilds flagged as SB servers.
    #[serde(default)]
    pub sb_only: bool,
}

/// Per-guild eligibility context. Read-only from the core's point of view.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuildContext {
    pub is_sb_server: bool,
}

/// The full parsed configuration handed to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Tier key -> weight configuration.
    pub rarities: HashMap<String, RarityConfig>,

    /// Item ID -> eligibility flags. Items missing from this map get
    /// default flags (drawable everywhere).
    #[serde(default)]
    pub items: HashMap<String, ItemDef>,

    /// Powerup IDs backing the item market. Drives market reconciliation.
    #[serde(default)]
    pub powerups: Vec<String>,

    /// Leaderboard metric keys, one board per key.
    #[serde(default)]
    pub boards: Vec<String>,

    /// Quest IDs eligible for the weekly rotation.
    #[serde(default)]
    pub quest_pool: Vec<String>,

    /// How many quests are active at once.
    #[serde(default = "default_active_quests")]
    pub active_quests: usize,

    /// Length of one day in milliseconds. Shortened in tests.
    #[serde(default = "default_day_length_ms")]
    pub day_length_ms: i64,

    /// Cap on the multiplier bonus a single boost stack may add.
    #[serde(default = "default_boost_cap")]
    pub boost_cap: u64,
}

fn default_true() -> bool {
    true
}

fn default_active_quests() -> usize {
    3
}

fn default_day_length_ms() -> i64 {
    24 * 60 * 60 * 1000
}

fn default_boost_cap() -> u64 {
    25
}

impl GameConfig {
    /// Flags for an item, falling back to defaults for unconfigured IDs.
    pub fn item(&self, item_id: &str) -> ItemDef {
        self.items.get(item_id).cloned().unwrap_or_default()
    }
}
