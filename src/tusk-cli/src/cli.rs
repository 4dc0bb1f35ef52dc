//! CLI argument definitions for tusk
//!
//! All clap-derived structs and enums for CLI parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tusk")]
#[command(about = "Tusk game data administration", long_about = None)]
pub struct Cli {
    /// Path to the parsed game configuration
    #[arg(long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory holding the global datasets
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory holding per-guild documents
    #[arg(long, global = true, default_value = "data/guilds")]
    pub guild_dir: PathBuf,

    /// Directory holding user profiles (for reconciliation payouts)
    #[arg(long, global = true, default_value = "data/users")]
    pub users_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run simulated draws and print the outcome histogram
    #[command(visible_alias = "s")]
    Simulate {
        /// Number of draws to simulate
        #[arg(short, long, default_value_t = 10_000)]
        draws: u64,

        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Simulate inside an SB server
        #[arg(long)]
        sb: bool,
    },

    /// Reconcile every global dataset against the configuration
    #[command(visible_alias = "r")]
    Reconcile,

    /// Print leaderboard standings
    #[command(visible_alias = "b")]
    Boards {
        /// Metric to print (all configured metrics if omitted)
        metric: Option<String>,

        /// How many entries per board
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Guild document operations
    #[command(visible_alias = "g")]
    Guild {
        #[command(subcommand)]
        command: GuildCommand,
    },

    /// Show or rotate the quest rotation
    #[command(visible_alias = "q")]
    Quests {
        /// Force a fresh rotation regardless of window age
        #[arg(long)]
        rotate: bool,
    },

    /// Ban list operations
    Bans {
        #[command(subcommand)]
        command: BanCommand,
    },
}

#[derive(Subcommand)]
pub enum GuildCommand {
    /// Show a guild's document
    Show {
        /// Guild ID
        id: String,
    },

    /// Remove a guild document if its setup was abandoned
    Remove {
        /// Guild ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum BanCommand {
    /// List banned users
    List,

    /// Ban a user
    Add {
        /// User ID
        user_id: String,
    },

    /// Unban a user
    Remove {
        /// User ID
        user_id: String,
    },
}
