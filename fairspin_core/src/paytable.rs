use serde::{Deserialize, Serialize};

use crate::symbols::ReelOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutResult {
    pub matches: u8,
    pub multiplier: u32,
}

impl PayoutResult {
    pub const LOSS: PayoutResult = PayoutResult {
        matches: 0,
        multiplier: 0,
    };

    pub fn is_win(&self) -> bool {
        self.multiplier > 0
    }
}

pub const PAYOUT_RULES: [PayoutResult; 2] = [
    PayoutResult {
        matches: 3,
        multiplier: 5,
    },
    PayoutResult {
        matches: 2,
        multiplier: 2,
    },
];

fn rule(matches: u8) -> PayoutResult {
    PAYOUT_RULES
        .iter()
        .copied()
        .find(|r| r.matches == matches)
        .unwrap_or(PayoutResult::LOSS)
}

/// Three of a kind pays 5x, any pair pays 2x, everything else loses.
pub fn evaluate(outcome: &ReelOutcome) -> PayoutResult {
    let [a, b, c] = outcome.0;
    // triple first, otherwise it would also count as a pair
    if a == b && b == c {
        return rule(3);
    }
    if a == b || b == c || a == c {
        return rule(2);
    }
    PayoutResult::LOSS
}

pub fn payout_amount(bet: f64, multiplier: u32) -> f64 {
    bet * f64::from(multiplier)
}
