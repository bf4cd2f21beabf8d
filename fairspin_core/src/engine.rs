use serde::{Deserialize, Serialize};

use crate::{
    paytable::{evaluate, payout_amount, PayoutResult},
    rng::{commit, unit_interval, Seed},
    symbols::{ReelOutcome, Symbol, SYMBOLS},
};

/// Nonces used for the left, middle and right reel.
pub const REEL_NONCES: [u32; 3] = [1, 2, 3];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub reels: ReelOutcome,
    pub result: PayoutResult,
    pub payout: f64,
    pub server_seed: Seed,
    pub seed_hash: String,
}

impl SpinOutcome {
    pub fn is_win(&self) -> bool {
        self.result.is_win()
    }
}

pub fn select_symbol(seed: &Seed, nonce: u32) -> Symbol {
    let u = unit_interval(seed, nonce);
    // u == 1.0 would index one past the end; from_index clamps it
    let index = (u * SYMBOLS.len() as f64).floor() as usize;
    Symbol::from_index(index)
}

pub fn generate_outcome(seed: &Seed) -> ReelOutcome {
    ReelOutcome(REEL_NONCES.map(|nonce| select_symbol(seed, nonce)))
}

/// Everything a spin computes before anything is persisted.
pub fn spin_once(seed: Seed, bet: f64) -> SpinOutcome {
    let seed_hash = commit(&seed);
    let reels = generate_outcome(&seed);
    let result = evaluate(&reels);
    SpinOutcome {
        reels,
        result,
        payout: payout_amount(bet, result.multiplier),
        server_seed: seed,
        seed_hash,
    }
}

/// Verify that a revealed seed matches its published commitment and the reels
/// that were shown for it.
pub fn verify_reels(seed: &Seed, seed_hash: &str, claimed: &ReelOutcome) -> bool {
    if !commit(seed).eq_ignore_ascii_case(seed_hash.trim()) {
        return false;
    }
    generate_outcome(seed) == *claimed
}

/// Like [`verify_reels`] but takes the seed as it was revealed. A seed that
/// does not parse cannot back any claim.
pub fn verify_revealed(seed_hex: &str, seed_hash: &str, claimed: &ReelOutcome) -> bool {
    match seed_hex.parse::<Seed>() {
        Ok(seed) => verify_reels(&seed, seed_hash, claimed),
        Err(_) => false,
    }
}
