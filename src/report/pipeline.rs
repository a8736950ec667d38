use anyhow::Result;
use chrono::Utc;
use tracing::{info, instrument};

use super::chart::{render_chart, ChartSpec};
use super::export::ReportDocument;
use super::filter::filter_countries;
use super::focus::{transform, Focus, FocusView};
use super::prompt::build_prompt;
use super::summarize::Summarizer;
use crate::database_ops::db::GameRow;

/// Everything derived from one focus view, before the summarizer runs.
#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub countries: Vec<String>,
    pub focus: Focus,
    pub view: FocusView,
    pub chart: ChartSpec,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub enum Preparation {
    /// No stored row matched the selected countries.
    NoData,
    Ready(PreparedReport),
}

/// Filter, transform once, then derive chart and prompt from that same view.
#[instrument(skip_all, fields(rows_in = rows.len(), focus = %focus))]
pub fn prepare_report<S: AsRef<str>>(
    rows: Vec<GameRow>,
    countries: &[S],
    focus: &Focus,
    user_extra: Option<&str>,
    markdown: bool,
) -> Preparation {
    let filtered = filter_countries(rows, countries);
    if filtered.is_empty() {
        info!("no rows for selected countries");
        return Preparation::NoData;
    }
    let view = transform(&filtered, focus);
    let chart = render_chart(&view);
    let prompt = build_prompt(&view, countries, focus, user_extra, markdown);
    info!(filtered = filtered.len(), view_rows = view.len(), "report prepared");
    Preparation::Ready(PreparedReport {
        countries: countries
            .iter()
            .map(|c| c.as_ref().trim().to_ascii_lowercase())
            .collect(),
        focus: focus.clone(),
        view,
        chart,
        prompt,
    })
}

/// Run the summarizer on a prepared report. Summarizer errors are returned as-is.
pub async fn generate_report(
    prepared: &PreparedReport,
    summarizer: &dyn Summarizer,
) -> Result<ReportDocument> {
    let summary = summarizer.summarize(&prepared.prompt).await?;
    Ok(ReportDocument {
        title: format!("Steam report: {}", prepared.focus.label()),
        generated_at: Utc::now(),
        countries: prepared.countries.clone(),
        focus: prepared.focus.key().to_string(),
        row_count: prepared.view.len(),
        chart: prepared.chart.clone(),
        prompt: prepared.prompt.clone(),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::sample_row;
    use crate::report::summarize::{OfflineSummarizer, OFFLINE_SUMMARY};
    use anyhow::anyhow;
    use async_trait::async_trait;

    #[test]
    fn unmatched_countries_give_no_data() {
        let rows = vec![sample_row(1, "jp")];
        assert!(matches!(
            prepare_report(rows, &["de"], &Focus::Price, None, false),
            Preparation::NoData
        ));
    }

    #[test]
    fn chart_and_prompt_share_the_view() {
        let rows: Vec<GameRow> = (0..60).map(|i| sample_row(i, "jp")).collect();
        let Preparation::Ready(p) = prepare_report(rows, &["JP"], &Focus::Price, None, false)
        else {
            panic!("expected a report");
        };
        assert_eq!(p.view.len(), 50);
        assert_eq!(p.chart.row_count, 50);
        assert!(p.prompt.contains("(Rows used: 50)"));
        assert_eq!(p.countries, vec!["jp".to_string()]);
    }

    #[tokio::test]
    async fn offline_report_carries_placeholder() {
        let Preparation::Ready(p) =
            prepare_report(vec![sample_row(1, "us")], &["us"], &Focus::Platform, None, true)
        else {
            panic!("expected a report");
        };
        let doc = generate_report(&p, &OfflineSummarizer).await.unwrap();
        assert_eq!(doc.summary, OFFLINE_SUMMARY);
        assert_eq!(doc.focus, "platform");
        assert_eq!(doc.row_count, p.view.len());
    }

    struct Failing;

    #[async_trait]
    impl Summarizer for Failing {
        async fn summarize(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("quota exceeded"))
        }
    }

    #[tokio::test]
    async fn summarizer_errors_propagate_unchanged() {
        let Preparation::Ready(p) =
            prepare_report(vec![sample_row(1, "us")], &["us"], &Focus::Price, None, false)
        else {
            panic!("expected a report");
        };
        let err = generate_report(&p, &Failing).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }
}
