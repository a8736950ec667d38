use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

use crate::database_ops::db::SqliteStore;

#[derive(Debug, Clone, Default)]
pub struct DbCountsConfig {
    pub db_path: PathBuf,
}

/// Rows per country in the store, printed as JSON.
pub async fn run(cfg: DbCountsConfig) -> Result<()> {
    let store = SqliteStore::open_existing(&cfg.db_path)
        .with_context(|| format!("failed to open store {}", cfg.db_path.display()))?;
    let counts = store.country_counts()?;
    println!("{}", serde_json::to_string_pretty(&counts_json(&cfg.db_path, &counts))?);
    Ok(())
}

fn counts_json(db_path: &std::path::Path, counts: &[(String, i64)]) -> Value {
    let total: i64 = counts.iter().map(|(_, n)| n).sum();
    let per_country: Map<String, Value> = counts
        .iter()
        .map(|(c, n)| (c.clone(), json!(n)))
        .collect();
    json!({
        "db_path": db_path.display().to_string(),
        "total": total,
        "countries": per_country,
    })
}
