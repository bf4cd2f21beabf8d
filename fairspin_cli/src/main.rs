use std::str::FromStr;

use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use fairspin_core::{verify_revealed, ReelOutcome, Symbol};
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, Row, SqlitePool};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fairspin-cli", about = "Admin CLI for the fairspin server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://fairspin.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// View last N spins
    ViewLogs {
        #[arg(default_value_t = 20)]
        n: i64,
    },
    /// Export all spins to a CSV file
    ExportCsv { path: String },
    /// Show balance and counters for an address
    Balance { address: String },
    /// Check a revealed seed against its commitment and reels (no database needed)
    Verify {
        seed: String,
        seed_hash: String,
        #[arg(num_args = 3, value_parser = parse_symbol)]
        reels: Vec<Symbol>,
    },
}

fn parse_symbol(s: &str) -> Result<Symbol, String> {
    Symbol::from_str(s).map_err(|e| e.to_string())
}

async fn get_pool(url: Option<String>) -> anyhow::Result<SqlitePool> {
    let url = url.unwrap_or_else(|| "sqlite://fairspin.db".into());
    debug!(%url, "opening database");
    let options = SqliteConnectOptions::from_str(&url)?.read_only(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

fn format_ts(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

fn run_verify(seed: &str, seed_hash: &str, reels: &[Symbol]) -> anyhow::Result<()> {
    let [a, b, c] = reels else {
        anyhow::bail!("expected exactly three reels, got {}", reels.len());
    };
    let valid = verify_revealed(seed, seed_hash, &ReelOutcome([*a, *b, *c]));
    println!("{}", if valid { "VALID" } else { "INVALID" });
    if !valid {
        anyhow::bail!("seed does not match the commitment and reels");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let Cli {
        command,
        database_url,
    } = Cli::parse();

    let pool = match &command {
        Commands::Verify {
            seed,
            seed_hash,
            reels,
        } => return run_verify(seed, seed_hash, reels),
        _ => get_pool(database_url).await?,
    };

    match command {
        Commands::ViewLogs { n } => {
            let rows = sqlx::query(
                "SELECT s.id, s.created_at, u.address, s.bet_amount, s.reel1, s.reel2, s.reel3, s.payout, s.seed_hash \
                 FROM spins s JOIN users u ON u.id = s.user_id ORDER BY s.id DESC LIMIT ?",
            )
            .bind(n)
            .fetch_all(&pool)
            .await?;
            for r in rows {
                let id: i64 = r.get("id");
                let created_at: i64 = r.get("created_at");
                let address: String = r.get("address");
                let bet: f64 = r.get("bet_amount");
                let reels = format!(
                    "{} {} {}",
                    r.get::<String, _>("reel1"),
                    r.get::<String, _>("reel2"),
                    r.get::<String, _>("reel3")
                );
                let payout: f64 = r.get("payout");
                let seed_hash: String = r.get("seed_hash");
                println!(
                    "#{:>6} {} {} bet={} reels={} payout={} hash={}",
                    id,
                    format_ts(created_at),
                    address,
                    bet,
                    reels,
                    payout,
                    seed_hash
                );
            }
        }
        Commands::ExportCsv { path } => {
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "id",
                "created_at",
                "address",
                "bet_amount",
                "reel1",
                "reel2",
                "reel3",
                "multiplier",
                "payout",
                "server_seed",
                "seed_hash",
            ])?;
            let rows = sqlx::query(
                "SELECT s.id, s.created_at, u.address, s.bet_amount, s.reel1, s.reel2, s.reel3, s.multiplier, s.payout, s.server_seed, s.seed_hash \
                 FROM spins s JOIN users u ON u.id = s.user_id ORDER BY s.id ASC",
            )
            .fetch_all(&pool)
            .await?;
            let total = rows.len();
            for r in &rows {
                wtr.write_record(&[
                    r.get::<i64, _>("id").to_string(),
                    format_ts(r.get::<i64, _>("created_at")),
                    r.get::<String, _>("address"),
                    r.get::<f64, _>("bet_amount").to_string(),
                    r.get::<String, _>("reel1"),
                    r.get::<String, _>("reel2"),
                    r.get::<String, _>("reel3"),
                    r.get::<i64, _>("multiplier").to_string(),
                    r.get::<f64, _>("payout").to_string(),
                    r.get::<String, _>("server_seed"),
                    r.get::<String, _>("seed_hash"),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", total, path);
        }
        Commands::Balance { address } => {
            let address = address.trim().to_ascii_lowercase();
            let row = sqlx::query(
                "SELECT balance, total_spins, total_wins, total_losses FROM users WHERE address = ?",
            )
            .bind(&address)
            .fetch_optional(&pool)
            .await?;
            match row {
                Some(r) => println!(
                    "{} balance={} spins={} wins={} losses={}",
                    address,
                    r.get::<f64, _>("balance"),
                    r.get::<i64, _>("total_spins"),
                    r.get::<i64, _>("total_wins"),
                    r.get::<i64, _>("total_losses")
                ),
                None => println!("{} has not played yet", address),
            }
        }
        Commands::Verify { .. } => {}
    }

    Ok(())
}
