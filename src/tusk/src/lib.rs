//! # tusk
//!
//! Collectible distribution core: rarity-weighted random draws plus the
//! reconciling JSON data stores that hold the shared game state.
//!
//! This crate is the logic layer of the game. The chat-platform command
//! handling, message formatting, and configuration loading live elsewhere;
//! this crate takes already-parsed configuration and resolved user/guild
//! IDs and provides:
//! - Weighted multi-draw selection with per-guild eligibility filtering
//! - Global datasets (market, leaderboards, quest rotation, ban list)
//!   that lazily seed themselves and reconcile against configuration
//! - Per-guild configuration documents with a guarded cleanup path
//!
//! ## Example
//!
//! ```no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use tusk::{draw, GameConfig, GlobalStore, GuildContext, RarityTable};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let raw = std::fs::read_to_string("config.json")?;
//! let config: GameConfig = serde_json::from_str(&raw)?;
//! let table = RarityTable::from_config(&config.rarities)?;
//!
//! let store = GlobalStore::new("data");
//! let mut rng = StdRng::from_entropy();
//!
//! let outcomes = draw(
//!     &table,
//!     &table.base_weights(),
//!     &config.items,
//!     &GuildContext::default(),
//!     false,
//!     0,
//!     &mut rng,
//! )?;
//!
//! for outcome in outcomes {
//!     match outcome.item_id {
//!         Some(id) => println!("drew {id}"),
//!         None => println!("nothing drawable this time"),
//!     }
//! }
//! # let _ = store;
//! # Ok(())
//! # }
//! ```

pub mod boards;
pub mod config;
pub mod draw;
pub mod eligibility;
pub mod guild;
pub mod market;
pub mod profile;
pub mod quest;
pub mod rarity;
pub mod store;

// Re-export commonly used items
#[doc(inline)]
pub use boards::{BoardData, BoardEntry, BoardsData};
#[doc(inline)]
pub use config::{GameConfig, GuildContext, ItemDef, RarityConfig};
#[doc(inline)]
pub use draw::{draw, draw_count, simulate, DrawError, DrawOutcome, DrawStats, ProbTable};
#[doc(inline)]
pub use eligibility::valid_candidates;
#[doc(inline)]
pub use guild::{GuildData, GuildStore};
#[doc(inline)]
pub use market::{ItemData, ItemsData, MarketOrder, Payout, PayoutSink};
#[doc(inline)]
pub use profile::UserProfile;
#[doc(inline)]
pub use quest::QuestData;
#[doc(inline)]
pub use rarity::{RarityError, RarityTable, RarityTier};
#[doc(inline)]
pub use store::{BansData, GitHubData, GlobalStore, StoreError, StoreResult};
