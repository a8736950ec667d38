use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use super::extract::{is_success, recommendation_total};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// CSV with `appid,name` columns, most popular first.
    pub app_ids_csv: PathBuf,
    pub limit: usize,
    pub min_recommendations: i64,
    /// Files modified within this many hours are not re-requested.
    pub fresh_hours: u64,
    pub delay_ms: u64,
    pub http_timeout_secs: u64,
    pub endpoint: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            app_ids_csv: PathBuf::from("data/popular_appids.csv"),
            limit: 500,
            min_recommendations: 1,
            fresh_hours: 24,
            delay_ms: 1000,
            http_timeout_secs: 15,
            endpoint: "https://store.steampowered.com/api/appdetails".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopularApp {
    pub appid: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub saved: usize,
    pub skipped_fresh: usize,
    /// Failed requests, `success: false`, or too few recommendations.
    pub rejected: usize,
}

/// First `limit` rows of the popular-apps CSV.
pub fn load_popular_apps(path: &Path, limit: usize) -> Result<Vec<PopularApp>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open app id list {}", path.display()))?;
    let mut out = Vec::new();
    for rec in rdr.deserialize::<PopularApp>().take(limit) {
        match rec {
            Ok(app) => out.push(app),
            Err(e) => warn!(error = %e, "skipping malformed app id row"),
        }
    }
    info!(count = out.len(), path = %path.display(), "loaded popular app ids");
    Ok(out)
}

pub fn raw_file_name(app_id: i64, country: &str) -> String {
    format!("{app_id}_{country}.json")
}

/// True when `path` exists and was modified less than `window` ago.
pub fn is_fresh(path: &Path, window: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(|t| SystemTime::now().duration_since(t).unwrap_or(Duration::ZERO))
        .is_some_and(|age| age < window)
}

/// Keep a response only when it succeeded and has enough recommendations.
pub fn accept(doc: &Value, app_id: i64, threshold: i64) -> bool {
    is_success(doc, app_id) && recommendation_total(doc, app_id) >= threshold
}

/// Downloads appdetails JSON per (country, app) into the raw directory.
pub struct SteamFetcher {
    http: Client,
    cfg: FetchConfig,
    out_dir: PathBuf,
}

impl SteamFetcher {
    pub fn new(cfg: FetchConfig, out_dir: impl Into<PathBuf>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            http,
            cfg,
            out_dir: out_dir.into(),
        })
    }

    pub async fn run(&self, countries: &[String]) -> Result<FetchSummary> {
        let apps = load_popular_apps(&self.cfg.app_ids_csv, self.cfg.limit)?;
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        let window = Duration::from_secs(self.cfg.fresh_hours * 3600);
        let delay = Duration::from_millis(self.cfg.delay_ms);
        let mut summary = FetchSummary::default();

        for country in countries {
            info!(country = %country, apps = apps.len(), "fetching appdetails");
            for app in &apps {
                let path = self.out_dir.join(raw_file_name(app.appid, country));
                if is_fresh(&path, window) {
                    debug!(app_id = app.appid, country = %country, "recently updated; skipping");
                    summary.skipped_fresh += 1;
                    continue;
                }
                let app_id = app.appid.to_string();
                let doc = get_with_backoff_json(
                    &self.http,
                    &self.cfg.endpoint,
                    &[("appids", app_id.as_str()), ("cc", country.as_str())],
                )
                .await;
                match doc {
                    Some(doc) if accept(&doc, app.appid, self.cfg.min_recommendations) => {
                        let body = serde_json::to_vec_pretty(&doc)?;
                        fs::write(&path, body)
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        debug!(
                            app_id = app.appid,
                            name = app.name.as_deref().unwrap_or(""),
                            country = %country,
                            "saved"
                        );
                        summary.saved += 1;
                    }
                    _ => {
                        debug!(app_id = app.appid, country = %country, "rejected");
                        summary.rejected += 1;
                    }
                }
                tokio::time::sleep(delay).await;
            }
        }
        info!(
            saved = summary.saved,
            skipped_fresh = summary.skipped_fresh,
            rejected = summary.rejected,
            "fetch complete"
        );
        Ok(summary)
    }
}

/// GET returning JSON; retries 429 with growing delays, honouring a larger
/// `Retry-After`. Any other non-success status yields `None`.
async fn get_with_backoff_json(
    client: &Client,
    url: &str,
    query_pairs: &[(&str, &str)],
) -> Option<Value> {
    let delays = [5u64, 10, 15, 20];
    let mut attempt: usize = 0;
    loop {
        let resp = match client
            .get(url)
            .header("Accept", "application/json")
            .query(query_pairs)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "appdetails request failed");
                return None;
            }
        };
        if resp.status() != StatusCode::TOO_MANY_REQUESTS {
            if !resp.status().is_success() {
                return None;
            }
            return resp.json::<Value>().await.ok();
        }
        if attempt >= delays.len() {
            warn!("rate limited; giving up after retries");
            return None;
        }
        let retry_after = resp
            .headers()
            .get("Retry-After")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let sleep_secs = backoff_secs(delays[attempt], retry_after);
        attempt += 1;
        warn!(attempt, sleep_secs, "rate limited; backing off");
        tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
    }
}

fn backoff_secs(scheduled: u64, retry_after: Option<u64>) -> u64 {
    retry_after.map_or(scheduled, |r| r.max(scheduled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tmp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("steam_fetch_{tag}_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn reads_first_rows_of_app_csv() {
        let dir = tmp_dir("csv");
        let path = dir.join("apps.csv");
        fs::write(&path, "appid,name\n570,Dota 2\n730,Counter-Strike 2\n440,TF2\n").unwrap();
        let apps = load_popular_apps(&path, 2).unwrap();
        assert_eq!(apps.iter().map(|a| a.appid).collect::<Vec<_>>(), vec![570, 730]);
        assert_eq!(apps[0].name.as_deref(), Some("Dota 2"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_csv_is_an_error() {
        assert!(load_popular_apps(Path::new("/nonexistent/apps.csv"), 10).is_err());
    }

    #[test]
    fn freshness_window() {
        let dir = tmp_dir("fresh");
        let path = dir.join(raw_file_name(10, "jp"));
        assert!(!is_fresh(&path, Duration::from_secs(3600)));
        fs::write(&path, "{}").unwrap();
        assert!(is_fresh(&path, Duration::from_secs(3600)));
        assert!(!is_fresh(&path, Duration::ZERO));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn acceptance_needs_success_and_threshold() {
        let ok = json!({ "10": { "success": true, "data": { "recommendations": { "total": 5 } } } });
        assert!(accept(&ok, 10, 1));
        assert!(accept(&ok, 10, 5));
        assert!(!accept(&ok, 10, 6));
        let no_recs = json!({ "10": { "success": true, "data": {} } });
        assert!(!accept(&no_recs, 10, 1));
        assert!(accept(&no_recs, 10, 0));
        let failed = json!({ "10": { "success": false } });
        assert!(!accept(&failed, 10, 0));
    }

    #[test]
    fn retry_after_only_extends_the_delay() {
        assert_eq!(backoff_secs(5, None), 5);
        assert_eq!(backoff_secs(5, Some(30)), 30);
        assert_eq!(backoff_secs(10, Some(2)), 10);
    }
}
