//! Leaderboard boards and the aggregator that maintains them.
//!
//! One board per configured metric. Each board holds at most one entry per
//! user and a weak `top_user` pointer (by ID only). A stored value is
//! always positive: computing a value of 0 for a metric removes the user's
//! entry from that board instead.

use crate::config::GameConfig;
use crate::profile::UserProfile;
use crate::store::{GlobalStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One user's row on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEntry {
    pub username: String,
    pub value: u64,
}

/// One leaderboard metric's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardData {
    /// User ID -> entry. Ordered so persisted JSON is byte-stable.
    #[serde(default)]
    pub user_data: BTreeMap<String, BoardEntry>,

    /// Current top holder by ID. Weak reference: the entry may have been
    /// removed since this was written, and removal clears the pointer
    /// without electing a successor (see [`recompute_top`]).
    #[serde(default)]
    pub top_user: Option<String>,
}

/// The whole leaderboard document: metric key -> board.
pub type BoardsData = BTreeMap<String, BoardData>;

/// Fresh leaderboard document with one empty board per configured metric.
pub fn seeded(metrics: &[String]) -> BoardsData {
    metrics
        .iter()
        .map(|m| (m.clone(), BoardData::default()))
        .collect()
}

/// Synchronize the board set with the configured metric list.
pub fn reconcile(boards: &mut BoardsData, metrics: &[String]) -> bool {
    let mut changed = false;

    for metric in metrics {
        if !boards.contains_key(metric) {
            boards.insert(metric.clone(), BoardData::default());
            changed = true;
        }
    }

    let stale: Vec<String> = boards
        .keys()
        .filter(|m| !metrics.contains(m))
        .cloned()
        .collect();
    for metric in stale {
        boards.remove(&metric);
        changed = true;
    }

    changed
}

/// Compute a user's current value for one metric.
///
/// Unknown metric keys score 0, which keeps the user off boards this build
/// doesn't understand rather than failing the whole update.
pub fn metric_value(metric: &str, profile: &UserProfile, config: &GameConfig) -> u64 {
    match metric {
        "score" => profile.score,
        "total" => profile.total_items(),
        "uniques" => profile.unique_counts(&config.items).0,
        "uniques_sb" => profile.unique_counts(&config.items).1,
        "streak" => profile.streak,
        "attempts" => profile.attempts,
        "top_attempts" => profile.top_attempts,
        "gifts_used" => profile.gifts_used,
        "multiplier" => profile.boosted_multiplier(config.boost_cap),
        "fastest_time" => profile.fastest_time_ms,
        other => {
            tracing::debug!(metric = other, "unknown leaderboard metric");
            0
        }
    }
}

/// Upsert or remove one user across every configured board.
pub fn apply_update(
    boards: &mut BoardsData,
    config: &GameConfig,
    user_id: &str,
    profile: &UserProfile,
) {
    for metric in &config.boards {
        let value = metric_value(metric, profile, config);
        let board = boards.entry(metric.clone()).or_default();

        if value > 0 {
            board.user_data.insert(
                user_id.to_string(),
                BoardEntry {
                    username: profile.username.clone(),
                    value,
                },
            );

            let top_value = board
                .top_user
                .as_deref()
                .and_then(|id| board.user_data.get(id))
                .map_or(0, |e| e.value);
            if board.top_user.is_none() || value > top_value {
                board.top_user = Some(user_id.to_string());
            }
        } else {
            board.user_data.remove(user_id);
            if board.top_user.as_deref() == Some(user_id) {
                board.top_user = None;
            }
        }
    }
}

/// Drop one user from every board.
///
/// Clears `top_user` where it pointed at the removed user but does not
/// elect a successor; callers that need a fresh top run
/// [`recompute_top`] afterwards.
pub fn apply_remove(boards: &mut BoardsData, user_id: &str) {
    for board in boards.values_mut() {
        board.user_data.remove(user_id);
        if board.top_user.as_deref() == Some(user_id) {
            board.top_user = None;
        }
    }
}

/// Recompute `top_user` from the entries actually on the board.
pub fn recompute_top(board: &mut BoardData) {
    board.top_user = board
        .user_data
        .iter()
        .max_by_key(|(_, entry)| entry.value)
        .map(|(id, _)| id.clone());
}

/// Recompute a user's entries on every board and persist the whole
/// document once, under the store's leaderboard lock.
pub fn update_user(
    store: &GlobalStore,
    config: &GameConfig,
    user_id: &str,
    profile: &UserProfile,
) -> StoreResult<()> {
    store.with_boards(config, |boards| {
        apply_update(boards, config, user_id, profile);
    })
}

/// Remove a user from every board and persist.
pub fn remove_user(store: &GlobalStore, config: &GameConfig, user_id: &str) -> StoreResult<()> {
    store.with_boards(config, |boards| {
        apply_remove(boards, user_id);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(metrics: &[&str]) -> GameConfig {
        serde_json::from_str::<GameConfig>(r#"{ "rarities": {} }"#)
            .map(|mut c| {
                c.boards = metrics.iter().map(|s| s.to_string()).collect();
                c
            })
            .unwrap()
    }

    fn profile(username: &str, score: u64) -> UserProfile {
        UserProfile {
            username: username.to_string(),
            score,
            ..Default::default()
        }
    }

    #[test]
    fn test_update_inserts_positive_values_only() {
        let config = config(&["score", "streak"]);
        let mut boards = seeded(&config.boards);

        apply_update(&mut boards, &config, "u1", &profile("Alice", 40));

        assert_eq!(boards["score"].user_data["u1"].value, 40);
        // Streak is 0 -> no entry.
        assert!(!boards["streak"].user_data.contains_key("u1"));
    }

    #[test]
    fn test_update_removes_when_value_drops_to_zero() {
        let config = config(&["score"]);
        let mut boards = seeded(&config.boards);

        apply_update(&mut boards, &config, "u1", &profile("Alice", 40));
        apply_update(&mut boards, &config, "u1", &profile("Alice", 0));

        assert!(boards["score"].user_data.is_empty());
        assert_eq!(boards["score"].top_user, None);
    }

    #[test]
    fn test_top_user_tracks_highest() {
        let config = config(&["score"]);
        let mut boards = seeded(&config.boards);

        apply_update(&mut boards, &config, "u1", &profile("Alice", 40));
        assert_eq!(boards["score"].top_user.as_deref(), Some("u1"));

        apply_update(&mut boards, &config, "u2", &profile("Bob", 10));
        assert_eq!(boards["score"].top_user.as_deref(), Some("u1"));

        apply_update(&mut boards, &config, "u2", &profile("Bob", 90));
        assert_eq!(boards["score"].top_user.as_deref(), Some("u2"));
    }

    #[test]
    fn test_remove_clears_top_without_successor() {
        let config = config(&["score"]);
        let mut boards = seeded(&config.boards);

        apply_update(&mut boards, &config, "u1", &profile("Alice", 40));
        apply_update(&mut boards, &config, "u2", &profile("Bob", 10));

        apply_remove(&mut boards, "u1");

        assert!(!boards["score"].user_data.contains_key("u1"));
        assert_eq!(boards["score"].top_user, None);

        recompute_top(boards.get_mut("score").unwrap());
        assert_eq!(boards["score"].top_user.as_deref(), Some("u2"));
    }

    #[test]
    fn test_no_board_ever_holds_zero_value() {
        let config = config(&[
            "score",
            "total",
            "uniques",
            "uniques_sb",
            "streak",
            "attempts",
            "top_attempts",
            "gifts_used",
            "multiplier",
            "fastest_time",
        ]);
        let mut boards = seeded(&config.boards);

        apply_update(&mut boards, &config, "u1", &UserProfile::default());

        for (metric, board) in &boards {
            assert!(
                board.user_data.is_empty(),
                "metric {metric} stored a zero value"
            );
        }
    }

    #[test]
    fn test_multiplier_metric_uses_boosts() {
        let config = config(&["multiplier"]);
        let mut boards = seeded(&config.boards);

        let user = UserProfile {
            username: "Alice".to_string(),
            multiplier: 100,
            boosts: 1,
            ..Default::default()
        };
        apply_update(&mut boards, &config, "u1", &user);
        assert_eq!(boards["multiplier"].user_data["u1"].value, 105);
    }

    #[test]
    fn test_reconcile_adds_and_drops_metrics() {
        let mut boards = seeded(&["score".to_string()]);
        boards
            .get_mut("score")
            .unwrap()
            .user_data
            .insert("u1".to_string(), BoardEntry {
                username: "Alice".to_string(),
                value: 1,
            });

        let metrics = vec!["score".to_string(), "streak".to_string()];
        assert!(reconcile(&mut boards, &metrics));
        assert!(boards.contains_key("streak"));

        let metrics = vec!["streak".to_string()];
        assert!(reconcile(&mut boards, &metrics));
        assert!(!boards.contains_key("score"));
    }

    #[test]
    fn test_unique_metrics_split_by_flag() {
        let mut config = config(&["uniques", "uniques_sb"]);
        config.items = HashMap::from([(
            "gilded".to_string(),
            crate::config::ItemDef {
                blacklisted: false,
                sb_only: true,
            },
        )]);

        let mut user = profile("Alice", 0);
        user.collection.insert("acorn".to_string(), 2);
        user.collection.insert("gilded".to_string(), 1);

        let mut boards = seeded(&config.boards);
        apply_update(&mut boards, &config, "u1", &user);

        assert_eq!(boards["uniques"].user_data["u1"].value, 1);
        assert_eq!(boards["uniques_sb"].user_data["u1"].value, 1);
    }
}
