use chrono::{DateTime, Utc};
use fairspin_core::{
    AccountSummary, HistoryPage, ReelOutcome, SpinError, SpinReceipt, StoredSpin,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    pub address: String,
    pub bet_amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub reels: ReelOutcome,
    pub win: bool,
    pub payout: f64,
    pub multiplier: u32,
    pub balance: f64,
    pub server_seed: String,
    pub seed_hash: String,
}

impl From<SpinReceipt> for SpinResponse {
    fn from(r: SpinReceipt) -> Self {
        Self {
            reels: r.reels,
            win: r.win,
            payout: r.payout,
            multiplier: r.multiplier,
            balance: r.balance,
            server_seed: r.server_seed.to_hex(),
            seed_hash: r.seed_hash,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub server_seed: String,
    pub seed_hash: String,
    pub reels: ReelOutcome,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VerifyResponse {
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AddressQuery {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryQuery {
    pub address: String,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub address: String,
    pub balance: f64,
    pub total_spins: u64,
    pub total_wins: u64,
    pub total_losses: u64,
    pub win_rate: f64,
    pub total_wagered: f64,
    pub total_payout: f64,
}

impl From<AccountSummary> for BalanceResponse {
    fn from(s: AccountSummary) -> Self {
        Self {
            address: s.address,
            balance: s.balance,
            total_spins: s.total_spins,
            total_wins: s.total_wins,
            total_losses: s.total_losses,
            win_rate: s.win_rate,
            total_wagered: s.total_wagered,
            total_payout: s.total_payout,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpinLogEntry {
    pub id: i64,
    pub bet_amount: f64,
    pub reels: ReelOutcome,
    pub payout: f64,
    pub multiplier: u32,
    pub is_win: bool,
    pub created_at: DateTime<Utc>,
    pub seed_hash: String,
    pub server_seed: String,
}

impl From<StoredSpin> for SpinLogEntry {
    fn from(s: StoredSpin) -> Self {
        Self {
            id: s.id,
            bet_amount: s.spin.bet_amount,
            reels: s.spin.reels,
            payout: s.spin.payout,
            multiplier: s.spin.result.multiplier,
            is_win: s.spin.is_win(),
            created_at: s.spin.created_at,
            seed_hash: s.spin.seed_hash,
            server_seed: s.spin.server_seed.to_hex(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub spins: Vec<SpinLogEntry>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

impl From<HistoryPage> for HistoryResponse {
    fn from(p: HistoryPage) -> Self {
        Self {
            spins: p.spins.into_iter().map(SpinLogEntry::from).collect(),
            total: p.total,
            page: p.page,
            limit: p.limit,
            has_more: p.has_more,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(String),
    #[error("insufficient balance")]
    InsufficientFunds,
    #[error("please wait before spinning again")]
    RateLimited { retry_after_ms: u64 },
    #[error("storage temporarily unavailable")]
    Unavailable,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Invalid(_) | ApiError::InsufficientFunds => 400,
            ApiError::RateLimited { .. } => 429,
            ApiError::Unavailable => 503,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

impl From<SpinError> for ApiError {
    fn from(e: SpinError) -> Self {
        match e {
            SpinError::InvalidInput(msg) => ApiError::Invalid(msg),
            SpinError::InsufficientFunds { .. } => ApiError::InsufficientFunds,
            SpinError::RateLimited { retry_after } => ApiError::RateLimited {
                retry_after_ms: retry_after.as_millis() as u64,
            },
            SpinError::Persistence(_) => ApiError::Unavailable,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `0x` followed by 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Validates and lowercases a wallet address.
pub fn normalize_address(address: &str) -> ApiResult<String> {
    let address = address.trim();
    if !is_valid_address(address) {
        return Err(ApiError::Invalid("invalid wallet address".into()));
    }
    Ok(address.to_ascii_lowercase())
}
