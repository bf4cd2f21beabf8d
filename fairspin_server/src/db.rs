use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fairspin_core::{
    Account, AccountStore, PayoutResult, ReelOutcome, Seed, SpinRecord, SpinTotals, StoreError,
    StoreResult, StoredSpin, Symbol,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

// DB schema is defined in migrations (see migrations/ folder)

pub async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn init_db(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    Ok(())
}

fn db_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Backend(format!("timestamp out of range: {ms}")))
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    address: String,
    balance: f64,
    total_spins: i64,
    total_wins: i64,
    total_losses: i64,
}

impl From<UserRow> for Account {
    fn from(r: UserRow) -> Self {
        Account {
            id: r.id,
            address: r.address,
            balance: r.balance,
            total_spins: r.total_spins.max(0) as u64,
            total_wins: r.total_wins.max(0) as u64,
            total_losses: r.total_losses.max(0) as u64,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SpinRow {
    id: i64,
    user_id: i64,
    bet_amount: f64,
    reel1: String,
    reel2: String,
    reel3: String,
    matches: i64,
    multiplier: i64,
    payout: f64,
    server_seed: String,
    seed_hash: String,
    created_at: i64,
}

impl SpinRow {
    fn into_stored(self) -> StoreResult<StoredSpin> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            StoreError::Backend(format!("spin {} has invalid {what}: {e}", self.id))
        };
        let mut reels = [Symbol::Cherry; 3];
        for (slot, text) in reels.iter_mut().zip([&self.reel1, &self.reel2, &self.reel3]) {
            *slot = text.parse().map_err(|e| corrupt("reel", &e))?;
        }
        let server_seed: Seed = self
            .server_seed
            .parse()
            .map_err(|e| corrupt("server_seed", &e))?;
        let result = PayoutResult {
            matches: u8::try_from(self.matches).map_err(|e| corrupt("matches", &e))?,
            multiplier: u32::try_from(self.multiplier).map_err(|e| corrupt("multiplier", &e))?,
        };
        Ok(StoredSpin {
            id: self.id,
            spin: SpinRecord {
                account_id: self.user_id,
                bet_amount: self.bet_amount,
                reels: ReelOutcome(reels),
                result,
                payout: self.payout,
                server_seed,
                seed_hash: self.seed_hash,
                created_at: from_millis(self.created_at)?,
            },
        })
    }
}

const USER_COLUMNS: &str = "id, address, balance, total_spins, total_wins, total_losses";
const SPIN_COLUMNS: &str = "id, user_id, bet_amount, reel1, reel2, reel3, matches, multiplier, payout, server_seed, seed_hash, created_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn get_account(&self, address: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE address = ?"
        ))
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Account::from))
    }

    async fn create_account(&self, address: &str, starting_balance: f64) -> StoreResult<Account> {
        sqlx::query(
            "INSERT INTO users (address, balance, created_at) VALUES (?, ?, ?) ON CONFLICT(address) DO NOTHING",
        )
        .bind(address)
        .bind(starting_balance)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        self.get_account(address)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("account {address} vanished after insert")))
    }

    async fn most_recent_spin(&self, account_id: i64) -> StoreResult<Option<SpinRecord>> {
        let row = sqlx::query_as::<_, SpinRow>(&format!(
            "SELECT {SPIN_COLUMNS} FROM spins WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.into_stored().map(|s| s.spin)).transpose()
    }

    async fn apply_spin(
        &self,
        account_id: i64,
        balance_delta: f64,
        win: bool,
        record: &SpinRecord,
    ) -> StoreResult<Account> {
        // dropping the transaction without commit rolls both statements back
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query(
            "UPDATE users SET balance = balance + ?, total_spins = total_spins + 1, \
             total_wins = total_wins + ?, total_losses = total_losses + ? WHERE id = ?",
        )
        .bind(balance_delta)
        .bind(i64::from(win))
        .bind(i64::from(!win))
        .bind(account_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::AccountNotFound(account_id));
        }

        let [r1, r2, r3] = record.reels.0;
        sqlx::query(
            "INSERT INTO spins (user_id, bet_amount, reel1, reel2, reel3, matches, multiplier, payout, is_win, server_seed, seed_hash, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(record.bet_amount)
        .bind(r1.glyph())
        .bind(r2.glyph())
        .bind(r3.glyph())
        .bind(i64::from(record.result.matches))
        .bind(i64::from(record.result.multiplier))
        .bind(record.payout)
        .bind(record.is_win())
        .bind(record.server_seed.to_hex())
        .bind(&record.seed_hash)
        .bind(to_millis(record.created_at))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let account = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(account_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(account.into())
    }

    async fn spin_history(
        &self,
        account_id: i64,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<StoredSpin>> {
        let offset = i64::try_from(offset)
            .map_err(|_| StoreError::Backend(format!("offset {offset} too large")))?;
        let rows = sqlx::query_as::<_, SpinRow>(&format!(
            "SELECT {SPIN_COLUMNS} FROM spins WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(account_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(SpinRow::into_stored).collect()
    }

    async fn spin_count(&self, account_id: i64) -> StoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM spins WHERE user_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count.max(0) as u64)
    }

    async fn spin_totals(&self, account_id: i64) -> StoreResult<SpinTotals> {
        let (wagered, paid_out): (f64, f64) = sqlx::query_as(
            "SELECT COALESCE(SUM(bet_amount), 0.0), COALESCE(SUM(payout), 0.0) FROM spins WHERE user_id = ?",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(SpinTotals { wagered, paid_out })
    }
}
