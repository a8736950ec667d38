//! `.env` loading plus typed getters for the settings in [`crate::config`].
//!
//! Every getter calls [`init_env`] first, so binaries and tests may read
//! settings without explicit setup.
use std::str::FromStr;
use std::sync::Once;
use tracing::info;

static DOTENV: Once = Once::new();

/// Name fragments whose values never appear in logs.
const SECRET_MARKERS: [&str; 4] = ["KEY", "TOKEN", "SECRET", "PASSWORD"];

pub fn init_env() {
    DOTENV.call_once(|| {
        if dotenv::dotenv().is_err() {
            // Working directory had no .env; try the crate root.
            let _ = dotenv::from_filename(concat!(env!("CARGO_MANIFEST_DIR"), "/.env"));
        }
    });
}

/// Trimmed value; unset and blank are both `None`.
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parsed value, or `default` when unset or unparsable.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

/// `1`, `true`, `yes` and `on` (any case) are true; any other set value is false.
pub fn env_flag(key: &str, default: bool) -> bool {
    match env_opt(key) {
        Some(raw) => ["1", "true", "yes", "on"]
            .iter()
            .any(|t| raw.eq_ignore_ascii_case(t)),
        None => default,
    }
}

/// Country-code style list from a comma/space separated variable.
pub fn env_list(key: &str) -> Option<Vec<String>> {
    env_opt(key).map(|raw| split_list(&raw)).filter(|l| !l.is_empty())
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ' '])
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn redact_value(key: &str, val: &str) -> String {
    let upper = key.to_ascii_uppercase();
    let val = val.trim();
    if !val.is_empty() && SECRET_MARKERS.iter().any(|m| upper.contains(m)) {
        "***".to_string()
    } else {
        val.to_string()
    }
}

/// Log `logged` keys (secrets masked) under `title`, then fail if any
/// `required` key is unset.
pub fn preflight_check(title: &str, required: &[&str], logged: &[&str]) -> anyhow::Result<()> {
    let snapshot: Vec<(&str, String)> = logged
        .iter()
        .map(|&k| (k, redact_value(k, &env_opt(k).unwrap_or_default())))
        .collect();
    info!(target: "preflight", title, snapshot = ?snapshot, "settings");
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|k| env_opt(k).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("missing required env: {}", missing.join(", ")))
    }
}
