use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use fairspin_core::{
    commit, generate_outcome, verify_reels, Account, AccountStore, GameConfig, ManualClock,
    MemoryStore, Seed, SeedSource, SlotMachine, SpinError, SpinRecord, SpinTotals, StoreError,
    StoreResult, StoredSpin,
};

// [0x07; 32] -> Lemon Cherry Seven, [0x71; 32] -> Diamond x3
const LOSING_BYTES: [u8; 10] = [1, 2, 3, 4, 7, 9, 10, 16, 17, 18];
const TRIPLE: u8 = 0x71;

/// Hands out seeds from a fixed list, round robin.
struct ScriptedSeeds {
    bytes: Vec<u8>,
    next: AtomicUsize,
}

impl ScriptedSeeds {
    fn new(bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            bytes: bytes.to_vec(),
            next: AtomicUsize::new(0),
        })
    }
}

impl SeedSource for ScriptedSeeds {
    fn next_seed(&self) -> Seed {
        let i = self.next.fetch_add(1, Ordering::SeqCst) % self.bytes.len();
        Seed::from_bytes([self.bytes[i]; 32])
    }
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

fn machine(seeds: &[u8], config: GameConfig) -> (SlotMachine<MemoryStore>, Arc<ManualClock>) {
    let clock = clock();
    let m = SlotMachine::new(MemoryStore::new(), config)
        .with_clock(clock.clone())
        .with_seed_source(ScriptedSeeds::new(seeds));
    (m, clock)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn losing_spin_debits_bet() {
    let (m, _) = machine(&[0x07], GameConfig::default());
    let r = m.perform_spin("0xabc", 0.1).await.unwrap();
    assert!(!r.win);
    assert_eq!(r.multiplier, 0);
    assert_eq!(r.payout, 0.0);
    assert!(approx(r.balance, 0.9));

    let account = m.store().get_account("0xabc").await.unwrap().unwrap();
    assert!(approx(account.balance, 0.9));
    assert_eq!((account.total_spins, account.total_wins, account.total_losses), (1, 0, 1));
}

#[tokio::test]
async fn triple_pays_five_times() {
    let (m, _) = machine(&[TRIPLE], GameConfig::default());
    let r = m.perform_spin("0xabc", 0.1).await.unwrap();
    assert!(r.win);
    assert_eq!(r.multiplier, 5);
    assert!(approx(r.payout, 0.5));
    assert!(approx(r.balance, 1.4));

    let account = m.store().get_account("0xabc").await.unwrap().unwrap();
    assert_eq!((account.total_spins, account.total_wins, account.total_losses), (1, 1, 0));
}

#[tokio::test]
async fn receipt_reveals_verifiable_seed() {
    let (m, _) = machine(&[0x07], GameConfig::default());
    let r = m.perform_spin("0xabc", 0.1).await.unwrap();
    assert_eq!(r.seed_hash, commit(&r.server_seed));
    assert_eq!(r.reels, generate_outcome(&r.server_seed));
    assert!(verify_reels(&r.server_seed, &r.seed_hash, &r.reels));

    let stored = m.store().most_recent_spin(1).await.unwrap().unwrap();
    assert_eq!(stored.server_seed, r.server_seed);
    assert_eq!(stored.seed_hash, r.seed_hash);
    assert_eq!(stored.reels, r.reels);
}

#[tokio::test]
async fn second_spin_inside_cooldown_is_rate_limited() {
    let (m, clock) = machine(&LOSING_BYTES, GameConfig::default());
    m.perform_spin("0xabc", 0.1).await.unwrap();
    clock.advance(Duration::milliseconds(500));
    let err = m.perform_spin("0xabc", 0.1).await.unwrap_err();
    match err {
        SpinError::RateLimited { retry_after } => {
            assert_eq!(retry_after, std::time::Duration::from_millis(1500));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
    let account = m.store().get_account("0xabc").await.unwrap().unwrap();
    assert_eq!(account.total_spins, 1);
    assert!(approx(account.balance, 0.9));
}

#[tokio::test]
async fn spin_after_cooldown_succeeds() {
    let (m, clock) = machine(&LOSING_BYTES, GameConfig::default());
    m.perform_spin("0xabc", 0.1).await.unwrap();
    clock.advance(Duration::milliseconds(2100));
    let r = m.perform_spin("0xabc", 0.1).await.unwrap();
    assert!(approx(r.balance, 0.8));
}

#[tokio::test]
async fn spin_times_are_kept_to_the_millisecond() {
    let (m, clock) = machine(&LOSING_BYTES, GameConfig::default());
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::nanoseconds(123_456_789);
    clock.set(start);
    m.perform_spin("0xabc", 0.1).await.unwrap();
    let first = m.store().most_recent_spin(1).await.unwrap().unwrap();
    assert_eq!(first.created_at.timestamp_subsec_nanos(), 123_000_000);

    // 1999.999999 ms of wall time, but a full 2000 ms between stored stamps
    clock.set(start + Duration::milliseconds(2000) - Duration::nanoseconds(1));
    m.perform_spin("0xabc", 0.1).await.unwrap();
    let second = m.store().most_recent_spin(1).await.unwrap().unwrap();
    assert_eq!(second.created_at - first.created_at, Duration::milliseconds(2000));
}

#[tokio::test]
async fn cooldown_is_per_account() {
    let (m, _) = machine(&LOSING_BYTES, GameConfig::default());
    m.perform_spin("0xaaa", 0.1).await.unwrap();
    m.perform_spin("0xbbb", 0.1).await.unwrap();
}

#[tokio::test]
async fn insufficient_funds_leaves_account_untouched() {
    let (m, _) = machine(&LOSING_BYTES, GameConfig::default());
    let err = m.perform_spin("0xabc", 2.0).await.unwrap_err();
    assert!(matches!(err, SpinError::InsufficientFunds { .. }));
    assert!(err.is_invalid_input());

    let account = m.store().get_account("0xabc").await.unwrap().unwrap();
    assert_eq!(account.balance, 1.0);
    assert_eq!(account.total_spins, 0);
    assert!(m.store().most_recent_spin(account.id).await.unwrap().is_none());
}

#[tokio::test]
async fn out_of_range_bets_are_rejected() {
    let (m, _) = machine(&LOSING_BYTES, GameConfig::default());
    for bet in [0.0, -0.5, 0.0001, 10.5, f64::NAN] {
        let err = m.perform_spin("0xabc", bet).await.unwrap_err();
        assert!(matches!(err, SpinError::InvalidInput(_)), "bet {bet}: {err:?}");
    }
    assert_eq!(m.store().spin_count(1).await.unwrap(), 0);
}

#[tokio::test]
async fn first_spin_creates_account_with_starting_balance() {
    let config = GameConfig {
        starting_balance: 3.0,
        ..GameConfig::default()
    };
    let (m, _) = machine(&[0x07], config);
    assert!(m.store().get_account("0xnew").await.unwrap().is_none());
    let r = m.perform_spin("0xnew", 2.5).await.unwrap();
    assert!(approx(r.balance, 0.5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_spins_apply_exactly_the_affordable_ones() {
    let config = GameConfig {
        cooldown_ms: 0,
        ..GameConfig::default()
    };
    let (m, _) = machine(&LOSING_BYTES, config);
    let m = Arc::new(m);
    m.store().create_account("0xabc", 1.0).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let m = m.clone();
            tokio::spawn(async move { m.perform_spin("0xabc", 0.3).await })
        })
        .collect();

    let mut ok = 0;
    let mut broke = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(SpinError::InsufficientFunds { .. }) => broke += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(ok, 3);
    assert_eq!(broke, 5);

    let account = m.store().get_account("0xabc").await.unwrap().unwrap();
    assert!(approx(account.balance, 0.1));
    assert_eq!(account.total_spins, 3);
    assert_eq!(m.store().spin_count(account.id).await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_spins_inside_cooldown_let_one_through() {
    let (m, _) = machine(&LOSING_BYTES, GameConfig::default());
    let m = Arc::new(m);

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let m = m.clone();
            tokio::spawn(async move { m.perform_spin("0xabc", 0.1).await })
        })
        .collect();

    let mut ok = 0;
    let mut limited = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(SpinError::RateLimited { .. }) => limited += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!((ok, limited), (1, 5));
    let account = m.store().get_account("0xabc").await.unwrap().unwrap();
    assert!(approx(account.balance, 0.9));
}

/// Fails every write, leaving the wrapped store untouched.
struct BrokenWrites(MemoryStore);

#[async_trait]
impl AccountStore for BrokenWrites {
    async fn get_account(&self, address: &str) -> StoreResult<Option<Account>> {
        self.0.get_account(address).await
    }

    async fn create_account(&self, address: &str, starting_balance: f64) -> StoreResult<Account> {
        self.0.create_account(address, starting_balance).await
    }

    async fn most_recent_spin(&self, account_id: i64) -> StoreResult<Option<SpinRecord>> {
        self.0.most_recent_spin(account_id).await
    }

    async fn apply_spin(&self, _: i64, _: f64, _: bool, _: &SpinRecord) -> StoreResult<Account> {
        Err(StoreError::Unavailable("disk on fire".into()))
    }

    async fn spin_history(&self, account_id: i64, limit: u32, offset: u64) -> StoreResult<Vec<StoredSpin>> {
        self.0.spin_history(account_id, limit, offset).await
    }

    async fn spin_count(&self, account_id: i64) -> StoreResult<u64> {
        self.0.spin_count(account_id).await
    }

    async fn spin_totals(&self, account_id: i64) -> StoreResult<SpinTotals> {
        self.0.spin_totals(account_id).await
    }
}

#[tokio::test]
async fn persistence_failure_surfaces_and_changes_nothing() {
    let m = SlotMachine::new(BrokenWrites(MemoryStore::new()), GameConfig::default())
        .with_clock(clock())
        .with_seed_source(ScriptedSeeds::new(&[TRIPLE]));
    let err = m.perform_spin("0xabc", 0.1).await.unwrap_err();
    assert!(matches!(err, SpinError::Persistence(StoreError::Unavailable(_))));

    let account = m.store().get_account("0xabc").await.unwrap().unwrap();
    assert_eq!(account.balance, 1.0);
    assert_eq!(account.total_spins, 0);
    assert_eq!(m.store().spin_count(account.id).await.unwrap(), 0);
}

#[tokio::test]
async fn summary_and_history_follow_spins() {
    let (m, clock) = machine(&[0x07, TRIPLE, 0x07], GameConfig::default());
    for _ in 0..3 {
        m.perform_spin("0xabc", 0.1).await.unwrap();
        clock.advance(Duration::seconds(3));
    }

    let s = m.account_summary("0xabc").await.unwrap();
    assert_eq!((s.total_spins, s.total_wins, s.total_losses), (3, 1, 2));
    assert_eq!(s.win_rate, 33.33);
    assert!(approx(s.total_wagered, 0.3));
    assert!(approx(s.total_payout, 0.5));
    assert!(approx(s.balance, 1.2));

    let page1 = m.history("0xabc", 1, 2).await.unwrap();
    assert_eq!(page1.total, 3);
    assert_eq!(page1.spins.len(), 2);
    assert!(page1.has_more);
    // newest first: the last spin used a losing seed, the middle one the triple
    assert_eq!(page1.spins[1].spin.result.multiplier, 5);
    assert!(page1.spins[0].spin.created_at > page1.spins[1].spin.created_at);

    let page2 = m.history("0xabc", 2, 2).await.unwrap();
    assert_eq!(page2.spins.len(), 1);
    assert!(!page2.has_more);
}
