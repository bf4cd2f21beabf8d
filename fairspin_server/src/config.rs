use clap::Parser;
use fairspin_core::GameConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "fairspin-server", about = "Provably-fair slot machine HTTP server")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,
    /// Database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://fairspin.db")]
    pub database_url: String,
    /// Balance credited to a new account on its first spin
    #[arg(long, env = "FAIRSPIN_STARTING_BALANCE")]
    pub starting_balance: Option<f64>,
    #[arg(long, env = "FAIRSPIN_MIN_BET")]
    pub min_bet: Option<f64>,
    #[arg(long, env = "FAIRSPIN_MAX_BET")]
    pub max_bet: Option<f64>,
    /// Minimum milliseconds between two spins of one account
    #[arg(long, env = "FAIRSPIN_COOLDOWN_MS")]
    pub cooldown_ms: Option<u64>,
}

impl ServerArgs {
    pub fn game_config(&self) -> GameConfig {
        let defaults = GameConfig::default();
        GameConfig {
            starting_balance: self.starting_balance.unwrap_or(defaults.starting_balance),
            min_bet: self.min_bet.unwrap_or(defaults.min_bet),
            max_bet: self.max_bet.unwrap_or(defaults.max_bet),
            cooldown_ms: self.cooldown_ms.unwrap_or(defaults.cooldown_ms),
        }
    }
}
