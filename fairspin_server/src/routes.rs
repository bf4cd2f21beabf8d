use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use fairspin_core::{verify_revealed, SlotMachine, DEFAULT_HISTORY_LIMIT};
use fairspin_shared::{
    normalize_address, AddressQuery, BalanceResponse, HistoryQuery, HistoryResponse, SpinRequest,
    SpinResponse, VerifyRequest, VerifyResponse,
};

use crate::db::SqliteStore;
use crate::error::ApiFailure;

#[derive(Clone)]
pub struct AppState {
    pub machine: Arc<SlotMachine<SqliteStore>>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(route_health))
        .route("/spin", post(route_spin))
        .route("/verify", post(route_verify))
        .route("/balance", get(route_balance))
        .route("/history", get(route_history))
        .with_state(state)
}

async fn route_health() -> &'static str {
    "ok"
}

async fn route_spin(
    State(state): State<AppState>,
    req: Result<Json<SpinRequest>, JsonRejection>,
) -> Result<Json<SpinResponse>, ApiFailure> {
    let Json(req) = req?;
    let address = normalize_address(&req.address)?;
    let receipt = state.machine.perform_spin(&address, req.bet_amount).await?;
    Ok(Json(receipt.into()))
}

async fn route_verify(
    req: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiFailure> {
    let Json(req) = req?;
    Ok(Json(VerifyResponse {
        valid: verify_revealed(&req.server_seed, &req.seed_hash, &req.reels),
    }))
}

async fn route_balance(
    State(state): State<AppState>,
    q: Result<Query<AddressQuery>, QueryRejection>,
) -> Result<Json<BalanceResponse>, ApiFailure> {
    let Query(q) = q?;
    let address = normalize_address(&q.address)?;
    let summary = state.machine.account_summary(&address).await?;
    Ok(Json(summary.into()))
}

async fn route_history(
    State(state): State<AppState>,
    q: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiFailure> {
    let Query(q) = q?;
    let address = normalize_address(&q.address)?;
    let page = state
        .machine
        .history(
            &address,
            q.page.unwrap_or(1),
            q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        )
        .await?;
    Ok(Json(page.into()))
}
