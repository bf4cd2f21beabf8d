//! The spin transaction: validate, rate-limit, compute, persist, reveal.
//!
//! Spins for one address run one at a time behind a per-address lock, so the
//! balance read, the cooldown check and the persisted update all see the same
//! account state. Spins for different addresses do not contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::SubsecRound;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::{
    account::{Account, SpinRecord, StoredSpin},
    clock::{Clock, SystemClock},
    config::GameConfig,
    engine::spin_once,
    rng::{OsSeedSource, Seed, SeedSource},
    store::{AccountStore, StoreError},
    symbols::ReelOutcome,
};

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpinError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient balance: bet {bet} exceeds balance {balance}")]
    InsufficientFunds { bet: f64, balance: f64 },

    #[error("please wait {}ms before spinning again", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl SpinError {
    /// Insufficient funds is a kind of invalid input, reported separately.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SpinError::InvalidInput(_) | SpinError::InsufficientFunds { .. }
        )
    }
}

/// What the player gets back once the spin is durable. This is the first
/// place the seed leaves the transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinReceipt {
    pub reels: ReelOutcome,
    pub win: bool,
    pub payout: f64,
    pub multiplier: u32,
    pub balance: f64,
    pub server_seed: Seed,
    pub seed_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub address: String,
    pub balance: f64,
    pub total_spins: u64,
    pub total_wins: u64,
    pub total_losses: u64,
    pub win_rate: f64,
    pub total_wagered: f64,
    pub total_payout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub spins: Vec<StoredSpin>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

/// Checks a bet against the table limits and the current balance.
pub fn validate_bet(bet: f64, balance: f64, config: &GameConfig) -> Result<(), SpinError> {
    if !bet.is_finite() || bet <= 0.0 {
        return Err(SpinError::InvalidInput(
            "bet amount must be greater than 0".into(),
        ));
    }
    if bet < config.min_bet {
        return Err(SpinError::InvalidInput(format!(
            "minimum bet is {}",
            config.min_bet
        )));
    }
    if bet > config.max_bet {
        return Err(SpinError::InvalidInput(format!(
            "maximum bet is {}",
            config.max_bet
        )));
    }
    if bet > balance {
        return Err(SpinError::InsufficientFunds { bet, balance });
    }
    Ok(())
}

/// Lock table keyed by address. Entries are dropped once nobody holds or
/// waits for them.
#[derive(Default)]
pub struct AccountLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

pub struct AccountGuard<'a> {
    locks: &'a AccountLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl AccountLocks {
    pub async fn lock(&self, key: &str) -> AccountGuard<'_> {
        let cell = {
            let mut table = self.table.lock();
            table.entry(key.to_string()).or_default().clone()
        };
        let guard = cell.lock_owned().await;
        AccountGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.locks.table.lock();
        // clones are only made under the table lock, so a count of one means
        // nobody is waiting
        if table
            .get(&self.key)
            .is_some_and(|cell| Arc::strong_count(cell) == 1)
        {
            table.remove(&self.key);
        }
    }
}

pub struct SlotMachine<S> {
    store: S,
    config: GameConfig,
    clock: Arc<dyn Clock>,
    seeds: Arc<dyn SeedSource>,
    locks: AccountLocks,
}

impl<S: AccountStore> SlotMachine<S> {
    pub fn new(store: S, config: GameConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            seeds: Arc::new(OsSeedSource),
            locks: AccountLocks::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_seed_source(mut self, seeds: Arc<dyn SeedSource>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Plays one spin for an already-normalized address.
    pub async fn perform_spin(&self, address: &str, bet: f64) -> Result<SpinReceipt, SpinError> {
        if address.trim().is_empty() {
            return Err(SpinError::InvalidInput("address must not be empty".into()));
        }

        let _guard = self.locks.lock(address).await;

        let account = self.load_or_create(address).await?;

        if let Err(e) = validate_bet(bet, account.balance, &self.config) {
            warn!(address, bet, error = %e, "spin rejected");
            return Err(e);
        }

        // stores keep millisecond timestamps
        let now = self.clock.now().trunc_subsecs(3);
        if let Some(last) = self.store.most_recent_spin(account.id).await? {
            let elapsed = now
                .signed_duration_since(last.created_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            let cooldown = self.config.cooldown();
            if elapsed < cooldown {
                let retry_after = cooldown - elapsed;
                warn!(address, retry_after_ms = retry_after.as_millis() as u64, "spin rate limited");
                return Err(SpinError::RateLimited { retry_after });
            }
        }

        let outcome = spin_once(self.seeds.next_seed(), bet);
        let win = outcome.is_win();
        let record = SpinRecord {
            account_id: account.id,
            bet_amount: bet,
            reels: outcome.reels,
            result: outcome.result,
            payout: outcome.payout,
            server_seed: outcome.server_seed,
            seed_hash: outcome.seed_hash.clone(),
            created_at: now,
        };

        let updated = self
            .store
            .apply_spin(account.id, outcome.payout - bet, win, &record)
            .await
            .map_err(|e| {
                warn!(address, error = %e, "spin could not be persisted");
                SpinError::Persistence(e)
            })?;

        info!(
            address,
            bet,
            multiplier = outcome.result.multiplier,
            balance = updated.balance,
            seed_hash = %outcome.seed_hash,
            "spin complete"
        );

        Ok(SpinReceipt {
            reels: outcome.reels,
            win,
            payout: outcome.payout,
            multiplier: outcome.result.multiplier,
            balance: updated.balance,
            server_seed: outcome.server_seed,
            seed_hash: outcome.seed_hash,
        })
    }

    async fn load_or_create(&self, address: &str) -> Result<Account, SpinError> {
        if let Some(account) = self.store.get_account(address).await? {
            return Ok(account);
        }
        let account = self
            .store
            .create_account(address, self.config.starting_balance)
            .await?;
        debug!(address, balance = account.balance, "created account");
        Ok(account)
    }

    /// Balance and lifetime stats. Unknown addresses report the starting state
    /// without creating an account.
    pub async fn account_summary(&self, address: &str) -> Result<AccountSummary, SpinError> {
        let Some(account) = self.store.get_account(address).await? else {
            return Ok(AccountSummary {
                address: address.to_string(),
                balance: self.config.starting_balance,
                total_spins: 0,
                total_wins: 0,
                total_losses: 0,
                win_rate: 0.0,
                total_wagered: 0.0,
                total_payout: 0.0,
            });
        };
        let totals = self.store.spin_totals(account.id).await?;
        Ok(AccountSummary {
            win_rate: account.win_rate(),
            address: account.address,
            balance: account.balance,
            total_spins: account.total_spins,
            total_wins: account.total_wins,
            total_losses: account.total_losses,
            total_wagered: totals.wagered,
            total_payout: totals.paid_out,
        })
    }

    /// Newest-first spin history. `page` starts at 1; `limit` is clamped to
    /// `1..=MAX_HISTORY_LIMIT`.
    pub async fn history(&self, address: &str, page: u32, limit: u32) -> Result<HistoryPage, SpinError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let Some(account) = self.store.get_account(address).await? else {
            return Ok(HistoryPage {
                spins: Vec::new(),
                total: 0,
                page,
                limit,
                has_more: false,
            });
        };
        let offset = u64::from(page - 1) * u64::from(limit);
        let spins = self.store.spin_history(account.id, limit, offset).await?;
        let total = self.store.spin_count(account.id).await?;
        Ok(HistoryPage {
            spins,
            total,
            page,
            limit,
            has_more: offset + u64::from(limit) < total,
        })
    }
}
