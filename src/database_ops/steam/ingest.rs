use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::extract::extract_from_slice;
use crate::database_ops::db::{GameRow, RowStore};
use crate::database_ops::exchange::ExchangeRates;

/// Country used when a file name carries no `_cc` suffix.
pub const UNKNOWN_COUNTRY: &str = "unknown";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub files: usize,
    pub extracted: usize,
    /// Unreadable files, bad names, or payloads the extractor rejected.
    pub skipped: usize,
    /// Rows that replaced an earlier row with the same (app_id, country).
    pub duplicates: usize,
}

#[derive(Debug, Default)]
pub struct Ingested {
    pub rows: Vec<GameRow>,
    pub summary: IngestSummary,
}

/// `570_jp.json` → `(570, "jp")`; `570.json` → `(570, "unknown")`.
pub fn parse_file_name(path: &Path) -> Option<(i64, String)> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.split('_');
    let app_id = parts.next()?.trim().parse::<i64>().ok()?;
    let country = parts
        .next()
        .map(|c| c.trim().to_ascii_lowercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());
    Some((app_id, country))
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read raw dir {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Extract every `*.json` in `dir`, in file-name order.
///
/// A later file for the same `(app_id, country)` overwrites the earlier row
/// but keeps its position.
pub fn ingest_dir(dir: &Path, rates: &ExchangeRates) -> Result<Ingested> {
    let files = json_files(dir)?;
    let mut summary = IngestSummary {
        files: files.len(),
        ..IngestSummary::default()
    };
    let mut rows: IndexMap<(i64, String), GameRow> = IndexMap::new();

    for path in &files {
        let Some((app_id, country)) = parse_file_name(path) else {
            warn!(path = %path.display(), "file name is not {{appid}}_{{cc}}.json; skipping");
            summary.skipped += 1;
            continue;
        };
        let raw = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable raw file; skipping");
                summary.skipped += 1;
                continue;
            }
        };
        let Some(row) = extract_from_slice(&raw, app_id, &country, rates) else {
            warn!(path = %path.display(), "no record extracted; skipping");
            summary.skipped += 1;
            continue;
        };
        summary.extracted += 1;
        if rows.insert((app_id, country), row).is_some() {
            summary.duplicates += 1;
        }
    }

    info!(
        files = summary.files,
        extracted = summary.extracted,
        skipped = summary.skipped,
        duplicates = summary.duplicates,
        "raw directory ingested"
    );
    Ok(Ingested {
        rows: rows.into_values().collect(),
        summary,
    })
}

/// Replace the store's table with `rows`. Zero rows leave the table untouched
/// unless `allow_empty`; returns `None` in that case.
pub fn store_rows(store: &mut dyn RowStore, rows: &[GameRow], allow_empty: bool) -> Result<Option<usize>> {
    if rows.is_empty() && !allow_empty {
        warn!("no rows extracted; existing table left untouched");
        return Ok(None);
    }
    store.replace_all(rows).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::{sample_row, MemoryStore};
    use serde_json::json;

    fn tmp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("steam_ingest_{tag}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn payload(app_id: i64, name: &str, final_minor: i64) -> String {
        json!({
            app_id.to_string(): {
                "success": true,
                "data": { "name": name, "price_overview": { "final": final_minor } }
            }
        })
        .to_string()
    }

    #[test]
    fn file_names() {
        assert_eq!(parse_file_name(Path::new("570_jp.json")), Some((570, "jp".into())));
        assert_eq!(parse_file_name(Path::new("d/570_US.json")), Some((570, "us".into())));
        assert_eq!(parse_file_name(Path::new("570.json")), Some((570, "unknown".into())));
        assert_eq!(parse_file_name(Path::new("abc_jp.json")), None);
    }

    #[test]
    fn ingests_sorted_and_skips_bad_files() {
        let dir = tmp_dir("sorted");
        fs::write(dir.join("20_us.json"), payload(20, "B", 1000)).unwrap();
        fs::write(dir.join("10_jp.json"), payload(10, "A", 1000)).unwrap();
        fs::write(dir.join("30_jp.json"), "{ not json").unwrap();
        fs::write(dir.join("40_jp.json"), json!({ "40": { "success": false } }).to_string()).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let rates = ExchangeRates::from_pairs([("us", 150.0)]);
        let out = ingest_dir(&dir, &rates).unwrap();
        assert_eq!(out.summary.files, 4);
        assert_eq!(out.summary.extracted, 2);
        assert_eq!(out.summary.skipped, 2);
        let ids: Vec<i64> = out.rows.iter().map(|r| r.app_id).collect();
        assert_eq!(ids, vec![10, 20]);
        assert_eq!(out.rows[0].price_jpy, 10);
        assert_eq!(out.rows[1].price_jpy, 1500);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_keys_keep_last_file() {
        let dir = tmp_dir("dupes");
        fs::write(dir.join("10_jp.json"), payload(10, "first", 100)).unwrap();
        fs::write(dir.join("10_jp_copy.json"), payload(10, "second", 200)).unwrap();
        fs::write(dir.join("11_jp.json"), payload(11, "other", 300)).unwrap();

        let out = ingest_dir(&dir, &ExchangeRates::empty()).unwrap();
        assert_eq!(out.summary.duplicates, 1);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].app_id, 10);
        assert_eq!(out.rows[0].name.as_deref(), Some("second"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_dir_is_an_error() {
        assert!(ingest_dir(Path::new("/nonexistent/raw"), &ExchangeRates::empty()).is_err());
    }

    #[test]
    fn empty_batch_leaves_store_alone() {
        let mut store = MemoryStore::default();
        store.replace_all(&[sample_row(1, "jp")]).unwrap();

        assert_eq!(store_rows(&mut store, &[], false).unwrap(), None);
        assert_eq!(store.load_all().unwrap().len(), 1);

        assert_eq!(store_rows(&mut store, &[], true).unwrap(), Some(0));
        assert!(store.load_all().unwrap().is_empty());
    }
}
