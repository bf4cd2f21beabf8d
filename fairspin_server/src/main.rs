use std::sync::Arc;

use clap::Parser;
use fairspin_core::SlotMachine;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod routes;

use crate::config::ServerArgs;
use crate::db::SqliteStore;
use crate::routes::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = ServerArgs::parse();
    let game = args.game_config();

    let db = db::connect(&args.database_url).await?;
    db::init_db(&db).await?;

    info!(
        min_bet = game.min_bet,
        max_bet = game.max_bet,
        cooldown_ms = game.cooldown_ms,
        "game configured"
    );
    let state = AppState {
        machine: Arc::new(SlotMachine::new(SqliteStore::new(db), game)),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!("listening on {}", args.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
