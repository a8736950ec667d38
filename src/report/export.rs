use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::chart::ChartSpec;
use super::focus::FocusView;

const CHART_TEXT_WIDTH: usize = 40;

/// Assembled report: chart, prompt and summary with run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub countries: Vec<String>,
    pub focus: String,
    pub row_count: usize,
    pub chart: ChartSpec,
    pub prompt: String,
    pub summary: String,
}

impl ReportDocument {
    /// File stem shared by every export of this report, e.g. `report_price_20250101T120000Z`.
    pub fn file_stem(&self) -> String {
        let focus: String = self
            .focus
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!(
            "report_{}_{}",
            focus,
            self.generated_at.format("%Y%m%dT%H%M%SZ")
        )
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# {}\n", self.title);
        let _ = writeln!(md, "- Generated: {}", self.generated_at.to_rfc3339());
        let _ = writeln!(md, "- Countries: {}", self.countries.join(", "));
        let _ = writeln!(md, "- Focus: {}", self.focus);
        let _ = writeln!(md, "- Rows used: {}\n", self.row_count);
        let _ = writeln!(md, "## Chart\n");
        let _ = writeln!(md, "```text\n{}```\n", self.chart.to_text(CHART_TEXT_WIDTH));
        let _ = writeln!(md, "## Summary\n");
        let _ = writeln!(md, "{}", self.summary.trim_end());
        md
    }
}

fn target(dir: &Path, stem: &str, ext: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create report dir {}", dir.display()))?;
    Ok(dir.join(format!("{stem}.{ext}")))
}

pub fn write_json(doc: &ReportDocument, dir: &Path) -> Result<PathBuf> {
    let path = target(dir, &doc.file_stem(), "json")?;
    let body = serde_json::to_string_pretty(doc)?;
    fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "report json written");
    Ok(path)
}

pub fn write_markdown(doc: &ReportDocument, dir: &Path) -> Result<PathBuf> {
    let path = target(dir, &doc.file_stem(), "md")?;
    fs::write(&path, doc.to_markdown()).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "report markdown written");
    Ok(path)
}

/// Focus view as CSV, same columns as the prompt table.
pub fn write_view_csv(view: &FocusView, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let table = view.table();
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("open {}", path.display()))?;
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = table.rows.len(), "view csv written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::{sample_row, GameRow};
    use crate::report::chart::render_chart;
    use crate::report::focus::{transform, Focus};
    use chrono::TimeZone;

    fn doc() -> (ReportDocument, FocusView) {
        let rows = vec![
            GameRow {
                is_free: true,
                ..sample_row(1, "jp")
            },
            sample_row(2, "us"),
        ];
        let view = transform(&rows, &Focus::IsFree);
        let doc = ReportDocument {
            title: "Steam report: free vs paid".into(),
            generated_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
            countries: vec!["jp".into(), "us".into()],
            focus: "is_free".into(),
            row_count: view.len(),
            chart: render_chart(&view),
            prompt: "p".into(),
            summary: "Free games dominate.".into(),
        };
        (doc, view)
    }

    #[test]
    fn stem_is_focus_and_timestamp() {
        assert_eq!(doc().0.file_stem(), "report_is_free_20250301T093000Z");
    }

    #[test]
    fn markdown_has_metadata_chart_and_summary() {
        let md = doc().0.to_markdown();
        assert!(md.starts_with("# Steam report: free vs paid"));
        assert!(md.contains("- Countries: jp, us"));
        assert!(md.contains("- Rows used: 2"));
        assert!(md.contains("```text\nFree vs paid (2 rows)"));
        assert!(md.trim_end().ends_with("Free games dominate."));
    }

    #[test]
    fn writes_all_exports() {
        let dir = std::env::temp_dir().join(format!("steam_report_export_{}", std::process::id()));
        let (doc, view) = doc();
        let json = write_json(&doc, &dir).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed["row_count"], 2);
        assert_eq!(parsed["chart"]["kind"], "count_bars");

        let md = write_markdown(&doc, &dir).unwrap();
        assert!(md.extension().is_some_and(|e| e == "md"));

        let csv_path = dir.join("view.csv");
        write_view_csv(&view, &csv_path).unwrap();
        let text = fs::read_to_string(&csv_path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("is_free,games,mean_price,mean_recommendations"));
        assert_eq!(text.lines().count(), 3);
        let _ = fs::remove_dir_all(&dir);
    }
}
