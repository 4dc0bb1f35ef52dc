//! Per-guild draw eligibility.

use crate::config::{GuildContext, ItemDef};
use crate::rarity::RarityTier;
use std::collections::HashMap;

/// Member IDs of `tier` that may be drawn in the given guild.
///
/// Excludes blacklisted items always, and SB-restricted items unless the
/// guild is an SB server. An empty result is a valid outcome (the whole
/// tier may be ineligible in this guild), not an error.
pub fn valid_candidates<'a>(
    tier: &'a RarityTier,
    items: &HashMap<String, ItemDef>,
    guild: &GuildContext,
) -> Vec<&'a str> {
    tier.items
        .iter()
        .filter(|id| {
            let flags = items.get(id.as_str()).cloned().unwrap_or_default();
            !flags.blacklisted && (!flags.sb_only || guild.is_sb_server)
        })
        .map(String::as_str)
        .collect()
}
