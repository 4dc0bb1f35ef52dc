//! Weekly quest rotation.
//!
//! The rotation document records when the current quest window opened and
//! which quest IDs are active. A window older than seven days (in the
//! configured day length) is regenerated from the most recent week
//! boundary with a fresh draw from the configured pool.

use crate::config::GameConfig;
use chrono::{DateTime, Datelike, Local, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The quest rotation document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestData {
    /// Epoch milliseconds of the current window start, aligned to the most
    /// recent week boundary.
    #[serde(default)]
    pub quests_start_timestamp: i64,

    /// Currently active quest IDs, fixed length, no repeats.
    #[serde(default)]
    pub cur_quest_ids: Vec<String>,
}

/// Most recent week boundary before `now`, in epoch milliseconds.
///
/// Local midnight today, minus the days elapsed since Sunday, with each
/// day expressed in the configured day length. Computed by arithmetic on
/// `now` itself so there is no timezone re-resolution involved.
pub fn week_start_ms(now: DateTime<Local>, day_length_ms: i64) -> i64 {
    let ms_since_midnight = i64::from(now.time().num_seconds_from_midnight()) * 1_000
        + i64::from(now.timestamp_subsec_millis());
    let midnight = now.timestamp_millis() - ms_since_midnight;
    let days_since_sunday = i64::from(now.weekday().num_days_from_sunday());
    midnight - days_since_sunday * day_length_ms
}

/// Draw `count` distinct IDs from `pool` by uniform index draw with
/// removal. Returns fewer when the pool is smaller than `count`.
pub fn draw_distinct(pool: &[String], count: usize, rng: &mut impl Rng) -> Vec<String> {
    let mut remaining: Vec<&String> = pool.iter().collect();
    let mut picked = Vec::with_capacity(count.min(remaining.len()));

    while picked.len() < count && !remaining.is_empty() {
        let idx = rng.gen_range(0..remaining.len());
        picked.push(remaining.remove(idx).clone());
    }

    picked
}

impl QuestData {
    /// Fresh rotation for the current week.
    pub fn fresh(config: &GameConfig, now: DateTime<Local>, rng: &mut impl Rng) -> Self {
        QuestData {
            quests_start_timestamp: week_start_ms(now, config.day_length_ms),
            cur_quest_ids: draw_distinct(&config.quest_pool, config.active_quests, rng),
        }
    }

    /// Regenerate the rotation when the stored window has aged out.
    ///
    /// The replacement draw keeps the current rotation length. Returns
    /// whether a rotation happened.
    pub fn rotate_if_stale(
        &mut self,
        config: &GameConfig,
        now: DateTime<Local>,
        rng: &mut impl Rng,
    ) -> bool {
        let age_ms = now.timestamp_millis() - self.quests_start_timestamp;
        if age_ms <= 7 * config.day_length_ms {
            return false;
        }

        let count = if self.cur_quest_ids.is_empty() {
            config.active_quests
        } else {
            self.cur_quest_ids.len()
        };

        self.quests_start_timestamp = week_start_ms(now, config.day_length_ms);
        self.cur_quest_ids = draw_distinct(&config.quest_pool, count, rng);
        tracing::info!(
            start = self.quests_start_timestamp,
            quests = ?self.cur_quest_ids,
            "rotated quest window"
        );
        true
    }
}
