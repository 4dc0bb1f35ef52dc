//! Global dataset store.
//!
//! Each named dataset (market, leaderboards, quest rotation, ban list,
//! release cache) is one JSON document under the store's directory. The
//! store is the sole writer of its backing files and holds one lock per
//! dataset kind across every load-reconcile-mutate-save cycle, so two
//! concurrent updates to the same dataset can't lose writes.
//!
//! Load failures are never fatal: a missing or unparsable document is
//! replaced by a freshly seeded default and persisted. Write failures
//! propagate to the caller untouched, since silently dropping a save is
//! worse than failing the action that triggered it.

use crate::boards::{self, BoardsData};
use crate::config::GameConfig;
use crate::market::{self, ItemsData, PayoutSink};
use crate::quest::QuestData;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const ITEMS_FILE: &str = "items.json";
const BOARDS_FILE: &str = "boards.json";
const QUESTS_FILE: &str = "quests.json";
const BANS_FILE: &str = "bans.json";
const GITHUB_FILE: &str = "github.json";

/// Banned user IDs. Ordered so the persisted document is byte-stable.
pub type BansData = BTreeSet<String>;

/// Cached release metadata. Only ever created when the configured
/// announcement channel is reachable; otherwise the document simply does
/// not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubData {
    #[serde(default)]
    pub release_tag: Option<String>,

    #[serde(default)]
    pub release_url: Option<String>,

    #[serde(default)]
    pub posted_at_ms: Option<i64>,
}

/// Read a JSON document, treating every failure as "does not exist".
///
/// A document that exists but fails to parse is logged; the caller will
/// reseed and overwrite it.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), %err, "unreadable document");
            }
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "corrupt document, reseeding");
            None
        }
    }
}

/// Serialize and atomically replace a JSON document.
///
/// Writes a sibling temp file first and renames it over the target, so a
/// reader in this process never observes a partial write.
pub(crate) fn write_document_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Handle to the global dataset directory.
pub struct GlobalStore {
    dir: PathBuf,
    items_lock: Mutex<()>,
    boards_lock: Mutex<()>,
    quests_lock: Mutex<()>,
    bans_lock: Mutex<()>,
    github_lock: Mutex<()>,
}

impl GlobalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        GlobalStore {
            dir: dir.into(),
            items_lock: Mutex::new(()),
            boards_lock: Mutex::new(()),
            quests_lock: Mutex::new(()),
            bans_lock: Mutex::new(()),
            github_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn load_or_seed<T: DeserializeOwned + Serialize>(
        &self,
        file: &str,
        seed: impl FnOnce() -> T,
    ) -> StoreResult<T> {
        let path = self.path(file);
        match read_document(&path) {
            Some(value) => Ok(value),
            None => {
                let value = seed();
                write_document_atomic(&path, &value)?;
                Ok(value)
            }
        }
    }

    // === Market ===

    /// Load the market document, seeding it on first use.
    pub fn load_items(&self, config: &GameConfig) -> StoreResult<ItemsData> {
        let _guard = self.items_lock.lock();
        self.load_or_seed(ITEMS_FILE, || market::seeded(&config.powerups))
    }

    /// Load the market document and synchronize it with configuration.
    ///
    /// Retired powerups pay out through `sink` before their key is
    /// deleted. The reconciled document is persisted before returning.
    pub fn load_and_reconcile_items(
        &self,
        config: &GameConfig,
        sink: &mut dyn PayoutSink,
    ) -> StoreResult<ItemsData> {
        let _guard = self.items_lock.lock();
        let mut data = self.load_or_seed(ITEMS_FILE, || market::seeded(&config.powerups))?;
        market::reconcile(&mut data, &config.powerups, sink);
        write_document_atomic(&self.path(ITEMS_FILE), &data)?;
        Ok(data)
    }

    pub fn save_items(&self, data: &ItemsData) -> StoreResult<()> {
        let _guard = self.items_lock.lock();
        write_document_atomic(&self.path(ITEMS_FILE), data)
    }

    /// Run a read-modify-write cycle on the market under its lock.
    pub fn with_items<R>(
        &self,
        config: &GameConfig,
        f: impl FnOnce(&mut ItemsData) -> R,
    ) -> StoreResult<R> {
        let _guard = self.items_lock.lock();
        let mut data = self.load_or_seed(ITEMS_FILE, || market::seeded(&config.powerups))?;
        let result = f(&mut data);
        write_document_atomic(&self.path(ITEMS_FILE), &data)?;
        Ok(result)
    }

    // === Leaderboards ===

    pub fn load_boards(&self, config: &GameConfig) -> StoreResult<BoardsData> {
        let _guard = self.boards_lock.lock();
        self.load_or_seed(BOARDS_FILE, || boards::seeded(&config.boards))
    }

    /// Load the leaderboards and synchronize the board set with the
    /// configured metric list, persisting before returning.
    pub fn load_and_reconcile_boards(&self, config: &GameConfig) -> StoreResult<BoardsData> {
        let _guard = self.boards_lock.lock();
        let mut data = self.load_or_seed(BOARDS_FILE, || boards::seeded(&config.boards))?;
        boards::reconcile(&mut data, &config.boards);
        write_document_atomic(&self.path(BOARDS_FILE), &data)?;
        Ok(data)
    }

    pub fn save_boards(&self, data: &BoardsData) -> StoreResult<()> {
        let _guard = self.boards_lock.lock();
        write_document_atomic(&self.path(BOARDS_FILE), data)
    }

    /// Run a read-modify-write cycle on the leaderboards under its lock.
    ///
    /// The whole document is persisted once after `f` returns, so partial
    /// updates are never observable.
    pub fn with_boards<R>(
        &self,
        config: &GameConfig,
        f: impl FnOnce(&mut BoardsData) -> R,
    ) -> StoreResult<R> {
        let _guard = self.boards_lock.lock();
        let mut data = self.load_or_seed(BOARDS_FILE, || boards::seeded(&config.boards))?;
        let result = f(&mut data);
        write_document_atomic(&self.path(BOARDS_FILE), &data)?;
        Ok(result)
    }

    // === Quest rotation ===

    pub fn load_quests(
        &self,
        config: &GameConfig,
        now: DateTime<Local>,
        rng: &mut impl Rng,
    ) -> StoreResult<QuestData> {
        let _guard = self.quests_lock.lock();
        self.load_or_seed(QUESTS_FILE, || QuestData::fresh(config, now, rng))
    }

    /// Load the quest rotation, regenerating it when the stored window is
    /// more than a week old, and persist before returning.
    pub fn load_and_reconcile_quests(
        &self,
        config: &GameConfig,
        now: DateTime<Local>,
        rng: &mut impl Rng,
    ) -> StoreResult<QuestData> {
        let _guard = self.quests_lock.lock();
        let mut data = self.load_or_seed(QUESTS_FILE, || QuestData::fresh(config, now, rng))?;
        data.rotate_if_stale(config, now, rng);
        write_document_atomic(&self.path(QUESTS_FILE), &data)?;
        Ok(data)
    }

    pub fn save_quests(&self, data: &QuestData) -> StoreResult<()> {
        let _guard = self.quests_lock.lock();
        write_document_atomic(&self.path(QUESTS_FILE), data)
    }

    // === Ban list ===

    pub fn load_bans(&self) -> StoreResult<BansData> {
        let _guard = self.bans_lock.lock();
        self.load_or_seed(BANS_FILE, BansData::new)
    }

    pub fn is_banned(&self, user_id: &str) -> StoreResult<bool> {
        Ok(self.load_bans()?.contains(user_id))
    }

    /// Add a user to the ban list. Returns false if already banned.
    pub fn ban(&self, user_id: &str) -> StoreResult<bool> {
        let _guard = self.bans_lock.lock();
        let mut bans = self.load_or_seed(BANS_FILE, BansData::new)?;
        let added = bans.insert(user_id.to_string());
        if added {
            write_document_atomic(&self.path(BANS_FILE), &bans)?;
        }
        Ok(added)
    }

    /// Remove a user from the ban list. Returns false if not banned.
    pub fn unban(&self, user_id: &str) -> StoreResult<bool> {
        let _guard = self.bans_lock.lock();
        let mut bans = self.load_or_seed(BANS_FILE, BansData::new)?;
        let removed = bans.remove(user_id);
        if removed {
            write_document_atomic(&self.path(BANS_FILE), &bans)?;
        }
        Ok(removed)
    }

    // === Release cache ===

    /// Load the release cache, creating it only when `available` says the
    /// external announcement channel is reachable.
    ///
    /// Returns `None` when the document does not exist and creation was
    /// skipped; that is a normal outcome, not an error.
    pub fn load_github(&self, available: impl FnOnce() -> bool) -> StoreResult<Option<GitHubData>> {
        let _guard = self.github_lock.lock();
        let path = self.path(GITHUB_FILE);

        if let Some(data) = read_document(&path) {
            return Ok(Some(data));
        }
        if !available() {
            return Ok(None);
        }

        let data = GitHubData::default();
        write_document_atomic(&path, &data)?;
        Ok(Some(data))
    }

    pub fn save_github(&self, data: &GitHubData) -> StoreResult<()> {
        let _guard = self.github_lock.lock();
        write_document_atomic(&self.path(GITHUB_FILE), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Payout;
    use crate::profile::UserProfile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct RecordingSink {
        payouts: Vec<Payout>,
    }

    impl PayoutSink for RecordingSink {
        fn credit(&mut self, payout: Payout) {
            self.payouts.push(payout);
        }
    }

    fn config() -> GameConfig {
        let mut config: GameConfig = serde_json::from_str(r#"{ "rarities": {} }"#).unwrap();
        config.powerups = vec!["boost".to_string(), "shield".to_string()];
        config.boards = vec!["score".to_string(), "streak".to_string()];
        config.quest_pool = (1..=6).map(|i| format!("q{i}")).collect();
        config
    }

    #[test]
    fn test_load_seeds_and_persists_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());
        let config = config();

        let data = store.load_items(&config).unwrap();
        assert_eq!(data.len(), 2);
        assert!(dir.path().join(ITEMS_FILE).exists());

        // A second load reads the persisted copy.
        let again = store.load_items(&config).unwrap();
        assert_eq!(again, data);
    }

    #[test]
    fn test_corrupt_document_is_reseeded() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());
        let config = config();

        fs::write(dir.path().join(BOARDS_FILE), b"{ not json").unwrap();
        let data = store.load_boards(&config).unwrap();
        assert_eq!(data.len(), 2);
        assert!(data.contains_key("score"));
    }

    #[test]
    fn test_reconcile_items_is_byte_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());
        let config = config();
        let mut sink = RecordingSink::default();

        store.load_and_reconcile_items(&config, &mut sink).unwrap();
        let first = fs::read(dir.path().join(ITEMS_FILE)).unwrap();

        store.load_and_reconcile_items(&config, &mut sink).unwrap();
        let second = fs::read(dir.path().join(ITEMS_FILE)).unwrap();

        assert_eq!(first, second);
        assert!(sink.payouts.is_empty());
    }

    #[test]
    fn test_reconcile_boards_is_byte_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());
        let config = config();

        store.load_and_reconcile_boards(&config).unwrap();
        let first = fs::read(dir.path().join(BOARDS_FILE)).unwrap();
        store.load_and_reconcile_boards(&config).unwrap();
        let second = fs::read(dir.path().join(BOARDS_FILE)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_retired_powerup_pays_out_before_removal() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());
        let mut config = config();

        // Put an order on a powerup, then retire it from configuration.
        store
            .with_items(&config, |data| {
                data.get_mut("boost").unwrap().buyers.push(
                    crate::market::MarketOrder {
                        num: 4,
                        filled_amount: 1,
                        claimed_amount: 0,
                        price: 10,
                        user_id: "alice".to_string(),
                    },
                );
            })
            .unwrap();

        config.powerups = vec!["shield".to_string()];
        let mut sink = RecordingSink::default();
        let data = store.load_and_reconcile_items(&config, &mut sink).unwrap();

        assert!(!data.contains_key("boost"));
        assert_eq!(sink.payouts.len(), 1);
        assert_eq!(sink.payouts[0].units, 1);
        assert_eq!(sink.payouts[0].score, 30);

        // The payout really lands on a profile.
        let mut profile = UserProfile::default();
        let payout = &sink.payouts[0];
        profile.credit(&payout.powerup_id, payout.units, payout.score);
        assert_eq!(profile.powerups["boost"], 1);
        assert_eq!(profile.score, 30);
    }

    #[test]
    fn test_quest_rotation_reconcile() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());
        let config = config();
        let now = Local::now();
        let mut rng = StdRng::seed_from_u64(3);

        // Seed a stale window by hand.
        let stale = QuestData {
            quests_start_timestamp: now.timestamp_millis() - 8 * config.day_length_ms,
            cur_quest_ids: vec!["q1".to_string(), "q2".to_string(), "q3".to_string()],
        };
        store.save_quests(&stale).unwrap();

        let data = store
            .load_and_reconcile_quests(&config, now, &mut rng)
            .unwrap();
        assert_ne!(data.quests_start_timestamp, stale.quests_start_timestamp);
        assert_eq!(data.cur_quest_ids.len(), 3);

        // Unchanged on a second pass.
        let first = fs::read(dir.path().join(QUESTS_FILE)).unwrap();
        store
            .load_and_reconcile_quests(&config, now, &mut rng)
            .unwrap();
        let second = fs::read(dir.path().join(QUESTS_FILE)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ban_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());

        assert!(!store.is_banned("alice").unwrap());
        assert!(store.ban("alice").unwrap());
        assert!(!store.ban("alice").unwrap());
        assert!(store.is_banned("alice").unwrap());
        assert!(store.unban("alice").unwrap());
        assert!(!store.is_banned("alice").unwrap());
    }

    #[test]
    fn test_github_creation_gated_by_availability() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());

        assert_eq!(store.load_github(|| false).unwrap(), None);
        assert!(!dir.path().join(GITHUB_FILE).exists());

        let created = store.load_github(|| true).unwrap();
        assert_eq!(created, Some(GitHubData::default()));
        assert!(dir.path().join(GITHUB_FILE).exists());

        // Once it exists, availability is no longer consulted.
        let loaded = store.load_github(|| false).unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn test_update_user_boards_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalStore::new(dir.path());
        let config = config();

        let profile = UserProfile {
            username: "Alice".to_string(),
            score: 12,
            streak: 4,
            ..Default::default()
        };
        crate::boards::update_user(&store, &config, "u1", &profile).unwrap();

        let boards = store.load_boards(&config).unwrap();
        assert_eq!(boards["score"].user_data["u1"].value, 12);
        assert_eq!(boards["streak"].user_data["u1"].value, 4);
        assert_eq!(boards["score"].top_user.as_deref(), Some("u1"));

        crate::boards::remove_user(&store, &config, "u1").unwrap();
        let boards = store.load_boards(&config).unwrap();
        assert!(boards["score"].user_data.is_empty());
        assert_eq!(boards["score"].top_user, None);
    }

    #[test]
    fn test_collections_serialize_deterministically() {
        // BTreeMap-backed documents must not depend on insertion order.
        let mut a = BTreeMap::new();
        a.insert("b".to_string(), 1);
        a.insert("a".to_string(), 2);

        let mut b = BTreeMap::new();
        b.insert("a".to_string(), 2);
        b.insert("b".to_string(), 1);

        assert_eq!(
            serde_json::to_vec_pretty(&a).unwrap(),
            serde_json::to_vec_pretty(&b).unwrap()
        );
    }
}
