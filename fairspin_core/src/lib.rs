pub mod account;
pub mod clock;
pub mod config;
pub mod engine;
pub mod machine;
pub mod paytable;
pub mod rng;
pub mod store;
pub mod symbols;

pub use crate::account::{Account, SpinRecord, SpinTotals, StoredSpin};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::GameConfig;
pub use crate::engine::{
    generate_outcome, select_symbol, spin_once, verify_reels, verify_revealed, SpinOutcome,
};
pub use crate::machine::{
    validate_bet, AccountSummary, HistoryPage, SlotMachine, SpinError, SpinReceipt,
    DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT,
};
pub use crate::paytable::{evaluate, payout_amount, PayoutResult, PAYOUT_RULES};
pub use crate::rng::{
    commit, derive_hash_hex, generate_seed, unit_interval, OsSeedSource, Seed, SeedParseError,
    SeedSource,
};
pub use crate::store::{AccountStore, MemoryStore, StoreError, StoreResult};
pub use crate::symbols::{ReelOutcome, Symbol, SymbolParseError, SYMBOLS};
