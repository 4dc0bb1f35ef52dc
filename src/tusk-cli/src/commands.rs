//! Command handlers.

use anyhow::{Context, Result};
use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use tusk::{
    draw, quest::QuestData, GameConfig, GlobalStore, GuildContext, GuildStore, Payout, PayoutSink,
    RarityTable, UserProfile,
};

/// Load and validate the game configuration.
pub fn load_config(path: &Path) -> Result<(GameConfig, RarityTable)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw).context("Failed to parse config file")?;
    let table = RarityTable::from_config(&config.rarities).context("Invalid rarity config")?;
    Ok((config, table))
}

/// Pays reconciliation compensation into profile documents on disk.
///
/// Profiles that don't exist yet are created, matching how the external
/// user-data component lazily creates them on first interaction.
struct ProfileDirSink {
    dir: PathBuf,
    credited: usize,
    failed: usize,
}

impl ProfileDirSink {
    fn new(dir: PathBuf) -> Self {
        ProfileDirSink {
            dir,
            credited: 0,
            failed: 0,
        }
    }

    fn apply(&self, payout: &Payout) -> Result<()> {
        let path = self.dir.join(format!("{}.json", payout.user_id));
        let mut profile: UserProfile = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse profile {}", path.display()))?,
            Err(_) => UserProfile::default(),
        };

        profile.credit(&payout.powerup_id, payout.units, payout.score);

        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(&profile)?)
            .with_context(|| format!("Failed to write profile {}", path.display()))?;
        Ok(())
    }
}

impl PayoutSink for ProfileDirSink {
    fn credit(&mut self, payout: Payout) {
        match self.apply(&payout) {
            Ok(()) => self.credited += 1,
            Err(err) => {
                tracing::warn!(user = payout.user_id.as_str(), %err, "payout failed");
                self.failed += 1;
            }
        }
    }
}

pub fn simulate(
    config_path: &Path,
    draws: u64,
    seed: Option<u64>,
    sb: bool,
) -> Result<()> {
    let (config, table) = load_config(config_path)?;
    let guild = GuildContext { is_sb_server: sb };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let stats = draw::simulate(&table, &config.items, &guild, draws, &mut rng)?;

    println!("Simulated {} draws:\n", stats.total_draws);
    println!("{:<12} {:<8} {:>10} {:>8}", "Tier", "Rank", "Count", "Share");
    println!("{}", "-".repeat(42));
    for (rank, count) in &stats.rank_counts {
        let key = table
            .tier_by_rank(*rank)
            .map_or("?", |t| t.key.as_str());
        let share = *count as f64 / stats.total_draws as f64 * 100.0;
        println!("{key:<12} {rank:<8} {count:>10} {share:>7.2}%");
    }

    println!("\nTop items:");
    let mut items: Vec<(&String, &u64)> = stats.item_counts.iter().collect();
    items.sort_by(|a, b| b.1.cmp(a.1));
    for (id, count) in items.iter().take(15) {
        println!("  {id:<24} {count:>8}");
    }

    if stats.empty_draws > 0 {
        println!(
            "\n{} draws yielded nothing ({:.2}% miss rate)",
            stats.empty_draws,
            stats.miss_rate_percent()
        );
    }

    Ok(())
}

pub fn reconcile(
    config_path: &Path,
    data_dir: &Path,
    users_dir: &Path,
) -> Result<()> {
    let (config, _table) = load_config(config_path)?;
    let store = GlobalStore::new(data_dir);

    let mut sink = ProfileDirSink::new(users_dir.to_path_buf());
    let items = store
        .load_and_reconcile_items(&config, &mut sink)
        .context("Market reconciliation failed")?;
    println!(
        "market: {} powerups ({} payouts, {} failed)",
        items.len(),
        sink.credited,
        sink.failed
    );

    let boards = store
        .load_and_reconcile_boards(&config)
        .context("Leaderboard reconciliation failed")?;
    println!("boards: {} metrics", boards.len());

    let mut rng = StdRng::from_entropy();
    let quests = store
        .load_and_reconcile_quests(&config, Local::now(), &mut rng)
        .context("Quest reconciliation failed")?;
    println!("quests: {:?}", quests.cur_quest_ids);

    Ok(())
}

pub fn show_boards(
    config_path: &Path,
    data_dir: &Path,
    metric: Option<&str>,
    limit: usize,
) -> Result<()> {
    let (config, _table) = load_config(config_path)?;
    let store = GlobalStore::new(data_dir);
    let boards_data = store.load_boards(&config)?;

    let selected: Vec<&String> = match metric {
        Some(m) => boards_data
            .keys()
            .filter(|k| k.as_str() == m)
            .collect(),
        None => boards_data.keys().collect(),
    };
    if selected.is_empty() {
        println!("No such board");
        return Ok(());
    }

    for key in selected {
        let board = &boards_data[key];
        println!("== {key} ==");

        let mut entries: Vec<_> = board.user_data.iter().collect();
        entries.sort_by(|a, b| b.1.value.cmp(&a.1.value));
        for (rank, (user_id, entry)) in entries.iter().take(limit).enumerate() {
            let marker = if board.top_user.as_deref() == Some(user_id.as_str()) {
                "*"
            } else {
                " "
            };
            println!(
                "{:>3}.{} {:<24} {:>12}  ({})",
                rank + 1,
                marker,
                entry.username,
                entry.value,
                user_id
            );
        }
        if board.user_data.is_empty() {
            println!("  (empty)");
        }
        println!();
    }

    Ok(())
}

pub fn guild_show(guild_dir: &Path, id: &str) -> Result<()> {
    let store = GuildStore::new(guild_dir);
    match store.get(id, false)? {
        Some(data) => {
            println!("guild {id}:");
            println!("  fully_setup:  {}", data.fully_setup);
            println!("  is_sb_server: {}", data.is_sb_server);
        }
        None => println!("guild {id}: no document"),
    }
    Ok(())
}

pub fn guild_remove(guild_dir: &Path, id: &str) -> Result<()> {
    let store = GuildStore::new(guild_dir);
    if store.remove(id)? {
        println!("removed guild {id}");
    } else {
        println!("guild {id} not removed (missing or fully set up)");
    }
    Ok(())
}

pub fn quests(config_path: &Path, data_dir: &Path, rotate: bool) -> Result<()> {
    let (config, _table) = load_config(config_path)?;
    let store = GlobalStore::new(data_dir);
    let mut rng = StdRng::from_entropy();

    let data = if rotate {
        let fresh = QuestData::fresh(&config, Local::now(), &mut rng);
        store.save_quests(&fresh)?;
        fresh
    } else {
        store.load_and_reconcile_quests(&config, Local::now(), &mut rng)?
    };

    println!("window start: {}", data.quests_start_timestamp);
    for (slot, id) in data.cur_quest_ids.iter().enumerate() {
        println!("  {}: {id}", slot + 1);
    }
    Ok(())
}

pub fn bans_list(data_dir: &Path) -> Result<()> {
    let store = GlobalStore::new(data_dir);
    let bans = store.load_bans()?;
    if bans.is_empty() {
        println!("No banned users");
    } else {
        for user in &bans {
            println!("{user}");
        }
    }
    Ok(())
}

pub fn bans_add(data_dir: &Path, user_id: &str) -> Result<()> {
    let store = GlobalStore::new(data_dir);
    if store.ban(user_id)? {
        println!("banned {user_id}");
    } else {
        println!("{user_id} already banned");
    }
    Ok(())
}

pub fn bans_remove(data_dir: &Path, user_id: &str) -> Result<()> {
    let store = GlobalStore::new(data_dir);
    if store.unban(user_id)? {
        println!("unbanned {user_id}");
    } else {
        println!("{user_id} was not banned");
    }
    Ok(())
}
