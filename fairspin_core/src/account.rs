use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{paytable::PayoutResult, rng::Seed, symbols::ReelOutcome};

/// A player's balance and lifetime counters, keyed by a normalized address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub address: String,
    pub balance: f64,
    pub total_spins: u64,
    pub total_wins: u64,
    pub total_losses: u64,
}

impl Account {
    pub fn new(id: i64, address: impl Into<String>, balance: f64) -> Self {
        Self {
            id,
            address: address.into(),
            balance,
            total_spins: 0,
            total_wins: 0,
            total_losses: 0,
        }
    }

    /// Win percentage rounded to two decimals.
    pub fn win_rate(&self) -> f64 {
        if self.total_spins == 0 {
            return 0.0;
        }
        let rate = self.total_wins as f64 / self.total_spins as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

/// One completed spin. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinRecord {
    pub account_id: i64,
    pub bet_amount: f64,
    pub reels: ReelOutcome,
    pub result: PayoutResult,
    pub payout: f64,
    pub server_seed: Seed,
    pub seed_hash: String,
    pub created_at: DateTime<Utc>,
}

impl SpinRecord {
    pub fn is_win(&self) -> bool {
        self.result.is_win()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSpin {
    pub id: i64,
    #[serde(flatten)]
    pub spin: SpinRecord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinTotals {
    pub wagered: f64,
    pub paid_out: f64,
}
