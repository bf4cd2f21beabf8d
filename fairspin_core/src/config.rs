use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub starting_balance: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    /// Minimum gap between two spins of the same account.
    pub cooldown_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1.0,
            min_bet: 0.001,
            max_bet: 10.0,
            cooldown_ms: 2000,
        }
    }
}

impl GameConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}
