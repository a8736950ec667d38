use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::database_ops::steam::fetch::{FetchConfig, FetchSummary, SteamFetcher};

#[derive(Debug, Clone)]
pub struct FetchRunConfig {
    pub countries: Vec<String>,
    pub raw_dir: PathBuf,
    pub fetch: FetchConfig,
}

pub async fn run(cfg: FetchRunConfig) -> Result<FetchSummary> {
    info!(
        countries = ?cfg.countries,
        limit = cfg.fetch.limit,
        threshold = cfg.fetch.min_recommendations,
        raw_dir = %cfg.raw_dir.display(),
        "fetch: starting"
    );
    let fetcher = SteamFetcher::new(cfg.fetch, cfg.raw_dir)?;
    let summary = fetcher.run(&cfg.countries).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(summary)
}
