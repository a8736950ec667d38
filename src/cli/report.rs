use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::database_ops::db::{RowStore, SqliteStore};
use crate::report::export::{write_json, write_markdown, write_view_csv};
use crate::report::summarize::{GeminiConfig, GeminiSummarizer, OfflineSummarizer, Summarizer};
use crate::report::{generate_report, prepare_report, Focus, Preparation};

pub const NO_DATA_MESSAGE: &str = "no data for selected countries";

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub db_path: PathBuf,
    pub countries: Vec<String>,
    pub focus: Focus,
    /// Extra question appended to the prompt.
    pub query: Option<String>,
    /// Skip the text generator and use a placeholder summary.
    pub no_ai: bool,
    /// Ask for plain text instead of Markdown.
    pub plain: bool,
    pub out_dir: PathBuf,
    /// Also export the focus view as CSV.
    pub csv: bool,
    pub gemini: GeminiConfig,
}

pub async fn run(cfg: ReportConfig) -> Result<()> {
    match &cfg.focus {
        Focus::Other(raw) => info!(focus = %raw, "report: unrecognized focus; using sample view"),
        known => info!(focus = %known, "report: starting"),
    }
    let store = SqliteStore::open_existing(&cfg.db_path)
        .with_context(|| format!("failed to open store {}", cfg.db_path.display()))?;
    let rows = store.load_all()?;

    let prepared = match prepare_report(
        rows,
        &cfg.countries,
        &cfg.focus,
        cfg.query.as_deref(),
        !cfg.plain,
    ) {
        Preparation::NoData => bail!(NO_DATA_MESSAGE),
        Preparation::Ready(p) => p,
    };

    let summarizer: Box<dyn Summarizer> = if cfg.no_ai {
        Box::new(OfflineSummarizer)
    } else {
        Box::new(GeminiSummarizer::new(&cfg.gemini)?)
    };
    let doc = generate_report(&prepared, summarizer.as_ref())
        .await
        .context("summary generation failed")?;

    println!("{}", doc.chart.to_text(40));
    println!("{}", doc.summary);

    let json = write_json(&doc, &cfg.out_dir)?;
    let md = write_markdown(&doc, &cfg.out_dir)?;
    println!("wrote {} and {}", json.display(), md.display());
    if cfg.csv {
        let path = cfg.out_dir.join(format!("{}_view.csv", doc.file_stem()));
        write_view_csv(&prepared.view, &path)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
