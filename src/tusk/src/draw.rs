//! Weighted draw engine.
//!
//! Converts rank weights into a cumulative probability table and performs
//! one or more draws against it. The random source is always injected so
//! callers (and tests) control determinism.
//!
//! A draw that lands on a tier with no eligible candidates yields an
//! outcome with no item. That is a valid "nothing drawable" result, not an
//! error; callers must treat it as "no item".

use crate::config::{GuildContext, ItemDef};
use crate::eligibility::valid_candidates;
use crate::rarity::RarityTable;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("no tier carries positive weight")]
    EmptyPool,

    #[error("weight table references unknown rank {0}")]
    UnknownRank(u16),
}

/// Cumulative probability boundary for one rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankBoundary {
    pub rank: u16,
    /// Upper cumulative probability in (0, 1].
    pub boundary: f64,
}

/// Cumulative probability table over rarity ranks.
///
/// Entries are ordered most-common first, so boundaries ascend. The final
/// entry's boundary is 1.0 up to floating error and acts as the catch-all
/// for any sample the earlier boundaries don't resolve.
#[derive(Debug, Clone)]
pub struct ProbTable {
    entries: Vec<RankBoundary>,
}

impl ProbTable {
    /// Normalize rank weights into cumulative boundaries.
    ///
    /// Ranks with zero weight are dropped (they are undrawable and must not
    /// capture a boundary). A table with no positive weight is a
    /// configuration error.
    pub fn from_weights(weights: &HashMap<u16, f64>) -> Result<Self, DrawError> {
        let mut ordered: Vec<(u16, f64)> = weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(r, w)| (*r, *w))
            .collect();

        let total: f64 = ordered.iter().map(|(_, w)| w).sum();
        if ordered.is_empty() || total <= 0.0 {
            return Err(DrawError::EmptyPool);
        }

        // Heaviest tier first, so boundaries ascend with rank order.
        ordered.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut running = 0.0;
        let entries = ordered
            .into_iter()
            .map(|(rank, weight)| {
                running += weight;
                RankBoundary {
                    rank,
                    boundary: running / total,
                }
            })
            .collect();

        Ok(ProbTable { entries })
    }

    pub fn boundaries(&self) -> &[RankBoundary] {
        &self.entries
    }

    /// Resolve a uniform sample in [0, 1) to a rank.
    ///
    /// Walks boundaries in ascending order and picks the first one at or
    /// above the sample. The last entry absorbs anything left over, which
    /// guards against the running sum landing just below 1.0.
    pub fn pick_rank(&self, sample: f64) -> u16 {
        for entry in &self.entries {
            if entry.boundary >= sample {
                return entry.rank;
            }
        }
        // Unreachable for samples in [0, 1) unless rounding shaved the top
        // boundary below 1.0.
        self.entries[self.entries.len() - 1].rank
    }
}

/// Result of a single draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    /// The drawn item, or `None` when the selected tier had no eligible
    /// candidates in this guild.
    pub item_id: Option<String>,

    /// Rank of the tier the draw landed on.
    pub rarity_rank: u16,
}

/// Number of draws to perform.
///
/// One base draw, plus `extra_value / 100` guaranteed bonus draws, plus one
/// further draw with probability `(extra_value % 100) / 100`. Values of 100
/// or more therefore always grant at least one bonus draw.
pub fn draw_count(extra_enabled: bool, extra_value: u64, rng: &mut impl Rng) -> usize {
    let mut count = 1;
    if extra_enabled {
        count += (extra_value / 100) as usize;
        if rng.gen_range(0..100) < extra_value % 100 {
            count += 1;
        }
    }
    count
}

/// Perform a full multi-draw against the given weights.
///
/// `weights` is a rank -> weight map, normally [`RarityTable::base_weights`]
/// with any caller-side adjustments applied. Outcomes are returned in draw
/// order; duplicates across draws are expected.
pub fn draw(
    table: &RarityTable,
    weights: &HashMap<u16, f64>,
    items: &HashMap<String, ItemDef>,
    guild: &GuildContext,
    extra_enabled: bool,
    extra_value: u64,
    rng: &mut impl Rng,
) -> Result<Vec<DrawOutcome>, DrawError> {
    let prob = ProbTable::from_weights(weights)?;
    let count = draw_count(extra_enabled, extra_value, rng);

    let mut outcomes = Vec::with_capacity(count);
    for _ in 0..count {
        let sample: f64 = rng.gen();
        let rank = prob.pick_rank(sample);
        let tier = table.tier_by_rank(rank).ok_or(DrawError::UnknownRank(rank))?;

        let candidates = valid_candidates(tier, items, guild);
        let item_id = if candidates.is_empty() {
            None
        } else {
            Some(candidates[rng.gen_range(0..candidates.len())].to_string())
        };

        tracing::debug!(
            sample,
            rank,
            tier = tier.key.as_str(),
            item = item_id.as_deref().unwrap_or("<none>"),
            "draw"
        );

        outcomes.push(DrawOutcome {
            item_id,
            rarity_rank: rank,
        });
    }

    Ok(outcomes)
}

/// Aggregate counts from repeated draws.
#[derive(Debug, Clone, Default)]
pub struct DrawStats {
    pub total_draws: u64,
    /// Draws that landed on a tier with no eligible candidates.
    pub empty_draws: u64,
    pub item_counts: BTreeMap<String, u64>,
    pub rank_counts: BTreeMap<u16, u64>,
}

impl DrawStats {
    pub fn miss_rate_percent(&self) -> f64 {
        if self.total_draws == 0 {
            0.0
        } else {
            (self.empty_draws as f64 / self.total_draws as f64) * 100.0
        }
    }
}

/// Run `iterations` single draws and collect a histogram.
pub fn simulate(
    table: &RarityTable,
    items: &HashMap<String, ItemDef>,
    guild: &GuildContext,
    iterations: u64,
    rng: &mut impl Rng,
) -> Result<DrawStats, DrawError> {
    let weights = table.base_weights();
    let mut stats = DrawStats::default();

    for _ in 0..iterations {
        let outcomes = draw(table, &weights, items, guild, false, 0, rng)?;
        for outcome in outcomes {
            stats.total_draws += 1;
            *stats.rank_counts.entry(outcome.rarity_rank).or_insert(0) += 1;
            match outcome.item_id {
                Some(id) => *stats.item_counts.entry(id).or_insert(0) += 1,
                None => stats.empty_draws += 1,
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RarityConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_table() -> RarityTable {
        let rarities = HashMap::from([
            (
                "common".to_string(),
                RarityConfig {
                    weight: 70.0,
                    from_daily: true,
                    items: vec!["acorn".to_string(), "pebble".to_string()],
                },
            ),
            (
                "rare".to_string(),
                RarityConfig {
                    weight: 30.0,
                    from_daily: true,
                    items: vec!["geode".to_string()],
                },
            ),
        ]);
        RarityTable::from_config(&rarities).unwrap()
    }

    #[test]
    fn test_boundaries_ascend_to_one() {
        let table = sample_table();
        let prob = ProbTable::from_weights(&table.base_weights()).unwrap();

        let mut prev = 0.0;
        for entry in prob.boundaries() {
            assert!(entry.boundary >= prev);
            prev = entry.boundary;
        }
        assert!((prev - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pick_rank_scenario() {
        // common=70, rare=30 -> boundaries common=0.7, rare=1.0.
        let table = sample_table();
        let prob = ProbTable::from_weights(&table.base_weights()).unwrap();

        assert_eq!(prob.boundaries()[0].boundary, 0.7);
        assert_eq!(prob.boundaries()[1].boundary, 1.0);

        let rare_rank = table.tiers()[1].rank;
        let common_rank = table.tiers()[0].rank;
        assert_eq!(prob.pick_rank(0.9), rare_rank);
        assert_eq!(prob.pick_rank(0.0), common_rank);
        assert_eq!(prob.pick_rank(0.7), common_rank);
    }

    #[test]
    fn test_zero_weight_rank_never_picked() {
        let weights = HashMap::from([(1u16, 0.0), (2u16, 10.0)]);
        let prob = ProbTable::from_weights(&weights).unwrap();
        assert_eq!(prob.boundaries().len(), 1);
        assert_eq!(prob.pick_rank(0.0), 2);
        assert_eq!(prob.pick_rank(0.999), 2);
    }

    #[test]
    fn test_empty_pool_is_error() {
        let weights = HashMap::from([(1u16, 0.0)]);
        assert!(matches!(
            ProbTable::from_weights(&weights),
            Err(DrawError::EmptyPool)
        ));
        assert!(matches!(
            ProbTable::from_weights(&HashMap::new()),
            Err(DrawError::EmptyPool)
        ));
    }

    #[test]
    fn test_single_draw_without_extra_chance() {
        let table = sample_table();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let outcomes = draw(
                &table,
                &table.base_weights(),
                &HashMap::new(),
                &GuildContext::default(),
                false,
                0,
                &mut rng,
            )
            .unwrap();
            assert_eq!(outcomes.len(), 1);
            assert!(outcomes[0].item_id.is_some());
        }
    }

    #[test]
    fn test_extra_chance_draw_counts() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            // 250 -> 2 guaranteed bonus draws plus a 50% third.
            let n = draw_count(true, 250, &mut rng);
            assert!((3..=4).contains(&n));

            // Whole hundreds are fully deterministic.
            assert_eq!(draw_count(true, 200, &mut rng), 3);
            assert_eq!(draw_count(true, 0, &mut rng), 1);
            assert_eq!(draw_count(false, 250, &mut rng), 1);
        }
    }

    #[test]
    fn test_ineligible_tier_yields_no_item() {
        let rarities = HashMap::from([(
            "common".to_string(),
            RarityConfig {
                weight: 1.0,
                from_daily: true,
                items: vec!["gilded".to_string()],
            },
        )]);
        let table = RarityTable::from_config(&rarities).unwrap();
        let items = HashMap::from([(
            "gilded".to_string(),
            ItemDef {
                blacklisted: false,
                sb_only: true,
            },
        )]);

        let mut rng = StdRng::seed_from_u64(1);
        let outcomes = draw(
            &table,
            &table.base_weights(),
            &items,
            &GuildContext {
                is_sb_server: false,
            },
            false,
            0,
            &mut rng,
        )
        .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].item_id, None);
        assert_eq!(outcomes[0].rarity_rank, 1);
    }

    #[test]
    fn test_simulate_histogram_sums() {
        let table = sample_table();
        let mut rng = StdRng::seed_from_u64(99);
        let stats = simulate(
            &table,
            &HashMap::new(),
            &GuildContext::default(),
            2_000,
            &mut rng,
        )
        .unwrap();

        assert_eq!(stats.total_draws, 2_000);
        assert_eq!(stats.empty_draws, 0);
        let item_total: u64 = stats.item_counts.values().sum();
        assert_eq!(item_total, 2_000);

        // Rough shape check: the common tier should dominate.
        assert!(stats.rank_counts[&1] > stats.rank_counts[&2]);
    }
}
