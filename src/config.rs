//! Process-wide configuration, read once from env/.env at startup.
//!
//! | variable | default |
//! |---|---|
//! | `STEAM_DB_PATH` | `data/steam_games.db` |
//! | `STEAM_RAW_DIR` | `data/raw_games_base` |
//! | `STEAM_COUNTRIES` | `jp,us,kr,de` |
//! | `FX_RATES` | built-in table; `us:150,kr:0.11` overrides entries |
//! | `STEAM_APPIDS_CSV` | `data/popular_appids.csv` |
//! | `STEAM_FETCH_LIMIT` | `500` |
//! | `STEAM_MIN_RECOMMENDATIONS` | `1` |
//! | `STEAM_FRESH_HOURS` | `24` |
//! | `STEAM_REQUEST_DELAY_MS` | `1000` |
//! | `STEAM_HTTP_TIMEOUT_SECS` | `15` |
//! | `STEAM_APPDETAILS_URL` | store appdetails endpoint |
//! | `GEMINI_API_KEY` | unset |
//! | `GEMINI_MODEL` | `gemini-2.0-flash` |
//! | `GEMINI_ENDPOINT` | Google v1beta endpoint |
//! | `GEMINI_TIMEOUT_SECS` | `120` |
//! | `REPORT_OUT_DIR` | `reports` |
//! | `REPORT_NO_AI` | `false`; same as `report --no-ai` |

use std::path::PathBuf;

use crate::database_ops::exchange::ExchangeRates;
use crate::database_ops::steam::fetch::FetchConfig;
use crate::report::summarize::GeminiConfig;
use crate::util::env::{env_list, env_opt, env_parse, preflight_check, split_list};

pub const DEFAULT_COUNTRIES: &str = "jp,us,kr,de";

/// Keys echoed (redacted) by [`AppConfig::log_snapshot`].
const SNAPSHOT_KEYS: &[&str] = &[
    "STEAM_DB_PATH",
    "STEAM_RAW_DIR",
    "STEAM_COUNTRIES",
    "FX_RATES",
    "STEAM_APPIDS_CSV",
    "GEMINI_API_KEY",
    "GEMINI_MODEL",
    "REPORT_OUT_DIR",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub raw_dir: PathBuf,
    /// Default country selection for `fetch` and `report`.
    pub countries: Vec<String>,
    pub rates: ExchangeRates,
    pub fetch: FetchConfig,
    pub gemini: GeminiConfig,
    pub report_out_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/steam_games.db"),
            raw_dir: PathBuf::from("data/raw_games_base"),
            countries: split_list(DEFAULT_COUNTRIES),
            rates: ExchangeRates::default(),
            fetch: FetchConfig::default(),
            gemini: GeminiConfig::default(),
            report_out_dir: PathBuf::from("reports"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = AppConfig::default();
        let rates = match env_opt("FX_RATES") {
            Some(spec) => d.rates.with_overrides(&spec),
            None => d.rates,
        };
        AppConfig {
            db_path: env_opt("STEAM_DB_PATH").map(PathBuf::from).unwrap_or(d.db_path),
            raw_dir: env_opt("STEAM_RAW_DIR").map(PathBuf::from).unwrap_or(d.raw_dir),
            countries: env_list("STEAM_COUNTRIES").unwrap_or(d.countries),
            rates,
            fetch: FetchConfig {
                app_ids_csv: env_opt("STEAM_APPIDS_CSV")
                    .map(PathBuf::from)
                    .unwrap_or(d.fetch.app_ids_csv),
                limit: env_parse("STEAM_FETCH_LIMIT", d.fetch.limit),
                min_recommendations: env_parse(
                    "STEAM_MIN_RECOMMENDATIONS",
                    d.fetch.min_recommendations,
                ),
                fresh_hours: env_parse("STEAM_FRESH_HOURS", d.fetch.fresh_hours),
                delay_ms: env_parse("STEAM_REQUEST_DELAY_MS", d.fetch.delay_ms),
                http_timeout_secs: env_parse("STEAM_HTTP_TIMEOUT_SECS", d.fetch.http_timeout_secs),
                endpoint: env_opt("STEAM_APPDETAILS_URL").unwrap_or(d.fetch.endpoint),
            },
            gemini: GeminiConfig {
                api_key: env_opt("GEMINI_API_KEY"),
                model: env_opt("GEMINI_MODEL").unwrap_or(d.gemini.model),
                endpoint: env_opt("GEMINI_ENDPOINT").unwrap_or(d.gemini.endpoint),
                timeout_secs: env_parse("GEMINI_TIMEOUT_SECS", d.gemini.timeout_secs),
            },
            report_out_dir: env_opt("REPORT_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.report_out_dir),
        }
    }

    /// Log a redacted snapshot; fails only when a `required` key is missing.
    pub fn log_snapshot(title: &str, required: &[&str]) -> anyhow::Result<()> {
        preflight_check(title, required, SNAPSHOT_KEYS)
    }
}
