use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::database_ops::db::SqliteStore;
use crate::database_ops::exchange::ExchangeRates;
use crate::database_ops::steam::ingest::{ingest_dir, store_rows};

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub raw_dir: PathBuf,
    pub db_path: PathBuf,
    pub rates: ExchangeRates,
    /// Replace the table even when nothing was extracted.
    pub allow_empty: bool,
}

pub async fn run(cfg: IngestConfig) -> Result<()> {
    info!(raw_dir = %cfg.raw_dir.display(), db = %cfg.db_path.display(), "ingest: starting");
    let ingested = ingest_dir(&cfg.raw_dir, &cfg.rates)?;
    let mut store = SqliteStore::open(&cfg.db_path)
        .with_context(|| format!("failed to open store {}", cfg.db_path.display()))?;
    let stored = store_rows(&mut store, &ingested.rows, cfg.allow_empty)?;
    match stored {
        Some(n) => println!("stored {n} rows in {}", cfg.db_path.display()),
        None => println!(
            "no rows extracted from {}; table left unchanged (use --allow-empty to clear it)",
            cfg.raw_dir.display()
        ),
    }
    println!("{}", serde_json::to_string_pretty(&ingested.summary)?);
    Ok(())
}
