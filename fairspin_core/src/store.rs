use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::account::{Account, SpinRecord, SpinTotals, StoredSpin};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary for accounts and spin history.
///
/// `apply_spin` must update the account and append the record as one unit:
/// either both are visible afterwards or neither is.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, address: &str) -> StoreResult<Option<Account>>;

    /// Returns the existing account if one was created concurrently.
    async fn create_account(&self, address: &str, starting_balance: f64) -> StoreResult<Account>;

    async fn most_recent_spin(&self, account_id: i64) -> StoreResult<Option<SpinRecord>>;

    async fn apply_spin(
        &self,
        account_id: i64,
        balance_delta: f64,
        win: bool,
        record: &SpinRecord,
    ) -> StoreResult<Account>;

    /// Newest first.
    async fn spin_history(
        &self,
        account_id: i64,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<StoredSpin>>;

    async fn spin_count(&self, account_id: i64) -> StoreResult<u64>;

    async fn spin_totals(&self, account_id: i64) -> StoreResult<SpinTotals>;
}

/// In-memory store for tests, demos and embedding.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_account_id: i64,
    accounts: HashMap<i64, Account>,
    by_address: HashMap<String, i64>,
    spins: Vec<StoredSpin>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, address: &str) -> StoreResult<Option<Account>> {
        let state = self.inner.lock();
        Ok(state
            .by_address
            .get(address)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn create_account(&self, address: &str, starting_balance: f64) -> StoreResult<Account> {
        let mut state = self.inner.lock();
        if let Some(id) = state.by_address.get(address) {
            if let Some(existing) = state.accounts.get(id) {
                return Ok(existing.clone());
            }
        }
        state.next_account_id += 1;
        let id = state.next_account_id;
        let account = Account::new(id, address, starting_balance);
        state.by_address.insert(address.to_string(), id);
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn most_recent_spin(&self, account_id: i64) -> StoreResult<Option<SpinRecord>> {
        let state = self.inner.lock();
        Ok(state
            .spins
            .iter()
            .filter(|s| s.spin.account_id == account_id)
            .max_by_key(|s| (s.spin.created_at, s.id))
            .map(|s| s.spin.clone()))
    }

    async fn apply_spin(
        &self,
        account_id: i64,
        balance_delta: f64,
        win: bool,
        record: &SpinRecord,
    ) -> StoreResult<Account> {
        let mut state = self.inner.lock();
        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::AccountNotFound(account_id))?;
        account.balance += balance_delta;
        account.total_spins += 1;
        if win {
            account.total_wins += 1;
        } else {
            account.total_losses += 1;
        }
        let updated = account.clone();
        let id = state.spins.len() as i64 + 1;
        state.spins.push(StoredSpin {
            id,
            spin: record.clone(),
        });
        Ok(updated)
    }

    async fn spin_history(
        &self,
        account_id: i64,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<StoredSpin>> {
        let state = self.inner.lock();
        let mut spins: Vec<StoredSpin> = state
            .spins
            .iter()
            .filter(|s| s.spin.account_id == account_id)
            .cloned()
            .collect();
        spins.sort_by(|a, b| (b.spin.created_at, b.id).cmp(&(a.spin.created_at, a.id)));
        Ok(spins
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn spin_count(&self, account_id: i64) -> StoreResult<u64> {
        let state = self.inner.lock();
        Ok(state
            .spins
            .iter()
            .filter(|s| s.spin.account_id == account_id)
            .count() as u64)
    }

    async fn spin_totals(&self, account_id: i64) -> StoreResult<SpinTotals> {
        let state = self.inner.lock();
        Ok(state
            .spins
            .iter()
            .filter(|s| s.spin.account_id == account_id)
            .fold(SpinTotals::default(), |mut t, s| {
                t.wagered += s.spin.bet_amount;
                t.paid_out += s.spin.payout;
                t
            }))
    }
}
