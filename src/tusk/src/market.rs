//! Powerup market document and reconciliation.
//!
//! The market document maps powerup IDs to their open buy/sell order books.
//! Reconciliation keeps the key set in sync with configuration; retiring a
//! key pays out every outstanding order first so no held value is lost.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One open order on a powerup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    /// Units originally ordered.
    pub num: u64,

    /// Units matched with a counterparty so far.
    #[serde(default)]
    pub filled_amount: u64,

    /// Filled units the owner has already claimed.
    #[serde(default)]
    pub claimed_amount: u64,

    /// Unit price in score.
    pub price: u64,

    pub user_id: String,
}

/// Order books for one powerup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    #[serde(default)]
    pub buyers: Vec<MarketOrder>,

    #[serde(default)]
    pub sellers: Vec<MarketOrder>,
}

/// The whole market document: powerup ID -> order books.
///
/// Ordered map so the persisted JSON is byte-stable across runs.
pub type ItemsData = BTreeMap<String, ItemData>;

/// Compensation owed to one user when a powerup is retired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub user_id: String,
    pub powerup_id: String,
    /// Units of the retired powerup returned to the user.
    pub units: u64,
    /// Score refunded for the unfilled or unclaimed remainder.
    pub score: u64,
}

/// Receives compensation payouts during reconciliation.
///
/// Implementations typically load the user's profile, apply
/// [`crate::profile::UserProfile::credit`], and save it back.
pub trait PayoutSink {
    fn credit(&mut self, payout: Payout);
}

/// Fresh market document seeded with one empty book per configured powerup.
pub fn seeded(powerups: &[String]) -> ItemsData {
    powerups
        .iter()
        .map(|id| (id.clone(), ItemData::default()))
        .collect()
}

/// Compensation for every outstanding order on a retired powerup.
///
/// Buy orders: the buyer already paid for `num` units up front, so they get
/// back the filled-but-unclaimed units plus score for the unfilled rest.
/// Sell orders: the seller escrowed `num` units, so they get back the
/// unfilled units plus score for the filled-but-unclaimed portion.
pub fn retirement_payouts(powerup_id: &str, data: &ItemData) -> Vec<Payout> {
    let mut payouts = Vec::with_capacity(data.buyers.len() + data.sellers.len());

    for order in &data.buyers {
        payouts.push(Payout {
            user_id: order.user_id.clone(),
            powerup_id: powerup_id.to_string(),
            units: order.filled_amount.saturating_sub(order.claimed_amount),
            score: order.num.saturating_sub(order.filled_amount) * order.price,
        });
    }

    for order in &data.sellers {
        payouts.push(Payout {
            user_id: order.user_id.clone(),
            powerup_id: powerup_id.to_string(),
            units: order.num.saturating_sub(order.filled_amount),
            score: order.filled_amount.saturating_sub(order.claimed_amount) * order.price,
        });
    }

    payouts
}

/// Synchronize the market's key set with configuration.
///
/// Missing configured powerups get a fresh empty book. Keys absent from
/// configuration are retired: every outstanding order is paid out through
/// `sink`, then the key is deleted. Returns whether anything changed.
pub fn reconcile(data: &mut ItemsData, powerups: &[String], sink: &mut dyn PayoutSink) -> bool {
    let mut changed = false;

    for id in powerups {
        if !data.contains_key(id) {
            data.insert(id.clone(), ItemData::default());
            changed = true;
        }
    }

    let retired: Vec<String> = data
        .keys()
        .filter(|id| !powerups.contains(id))
        .cloned()
        .collect();

    for id in retired {
        if let Some(book) = data.remove(&id) {
            let payouts = retirement_payouts(&id, &book);
            tracing::info!(powerup = id.as_str(), orders = payouts.len(), "retiring powerup");
            for payout in payouts {
                sink.credit(payout);
            }
            changed = true;
        }
    }

    changed
}
