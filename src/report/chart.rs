//! Chart selection per focus view.
//!
//! Drawing is left to whatever consumes the [`ChartSpec`] (the markdown
//! export renders it as text bars); this module decides the chart kind,
//! labels and plotted data.

use serde::Serialize;
use std::fmt::Write as _;

use super::focus::{FocusView, GroupStats, NamedCount, PriceBands};

const PRICE_BINS: usize = 30;
const REVIEW_BINS: usize = 30;
const YEAR_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Histogram,
    CountBars,
    RankedBars,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChartData {
    Bins(Vec<HistogramBin>),
    Bars(Vec<Bar>),
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Bins(b) => b.is_empty(),
            ChartData::Bars(b) => b.is_empty(),
        }
    }
}

/// Chart handle handed to report assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Rows in the view the chart was built from (also embedded in `title`).
    pub row_count: usize,
    pub data: ChartData,
    /// Second series of the price chart: free/paid split and JPY bands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_bands: Option<PriceBands>,
}

/// Pick and fill the chart for a view. Never fails; empty views give empty data.
pub fn render_chart(view: &FocusView) -> ChartSpec {
    let n = view.len();
    match view {
        FocusView::Price(rows) => {
            let prices: Vec<f64> = rows.iter().map(|r| r.price).filter(|p| *p > 0.0).collect();
            ChartSpec {
                price_bands: view.price_bands(),
                ..histogram_spec(
                    format!("Price distribution ({n} rows)"),
                    "price",
                    n,
                    histogram(&prices, PRICE_BINS),
                )
            }
        }
        FocusView::ReviewCount(rows) => {
            let recos: Vec<f64> = rows
                .iter()
                .filter(|r| r.recommendations > 0)
                .map(|r| r.recommendations as f64)
                .collect();
            histogram_spec(
                format!("Review count distribution ({n} rows)"),
                "recommendations",
                n,
                histogram(&recos, REVIEW_BINS),
            )
        }
        FocusView::ReleaseYear(rows) => {
            let years: Vec<f64> = rows.iter().map(|d| f64::from(d.year)).collect();
            histogram_spec(
                format!("Release year distribution ({n} rows)"),
                "year",
                n,
                histogram(&years, YEAR_BINS),
            )
        }
        FocusView::IsFree(groups) => count_spec(
            format!("Free vs paid ({n} rows)"),
            "is_free",
            n,
            group_bars(groups),
        ),
        FocusView::RequiredAge(groups) => count_spec(
            format!("Games per age rating ({n} rows)"),
            "required_age",
            n,
            group_bars(groups),
        ),
        FocusView::Developer(counts) => ranked_spec(
            format!("Top developers by game count ({n} rows)"),
            "developer",
            n,
            counts,
        ),
        FocusView::Platform(counts) => ranked_spec(
            format!("Platform support ({n} rows)"),
            "platform",
            n,
            counts,
        ),
        FocusView::Sample(rows) => {
            let mut per_country: Vec<Bar> = Vec::new();
            for r in rows {
                match per_country.iter_mut().find(|b| b.label == r.country) {
                    Some(bar) => bar.value += 1.0,
                    None => per_country.push(Bar {
                        label: r.country.clone(),
                        value: 1.0,
                    }),
                }
            }
            count_spec(
                format!("Sample rows per country ({n} rows)"),
                "country",
                n,
                per_country,
            )
        }
    }
}

fn histogram_spec(title: String, x: &str, n: usize, bins: Vec<HistogramBin>) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Histogram,
        title,
        x_label: x.to_string(),
        y_label: "games".to_string(),
        row_count: n,
        data: ChartData::Bins(bins),
        price_bands: None,
    }
}

fn count_spec(title: String, x: &str, n: usize, bars: Vec<Bar>) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::CountBars,
        title,
        x_label: x.to_string(),
        y_label: "games".to_string(),
        row_count: n,
        data: ChartData::Bars(bars),
        price_bands: None,
    }
}

// Horizontal: categories on the y axis, counts on the x axis.
fn ranked_spec(title: String, y: &str, n: usize, counts: &[NamedCount]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::RankedBars,
        title,
        x_label: "games".to_string(),
        y_label: y.to_string(),
        row_count: n,
        data: ChartData::Bars(
            counts
                .iter()
                .map(|c| Bar {
                    label: if c.name.is_empty() {
                        "(none)".to_string()
                    } else {
                        c.name.clone()
                    },
                    value: c.count as f64,
                })
                .collect(),
        ),
        price_bands: None,
    }
}

fn group_bars<K: ToString>(groups: &[GroupStats<K>]) -> Vec<Bar> {
    groups
        .iter()
        .map(|g| Bar {
            label: g.key.to_string(),
            value: g.count as f64,
        })
        .collect()
}

/// Equal-width bins over `[min, max]`; the last bin is closed on the right.
/// A single distinct value gets one bin of width 1 centred on it.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            start: min - 0.5,
            end: max + 0.5,
            count: values.len(),
        }];
    }
    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

impl ChartSpec {
    /// Plain-text bar rendering for terminals and markdown code blocks.
    pub fn to_text(&self, width: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let bars: Vec<(String, f64)> = match &self.data {
            ChartData::Bins(bins) => bins
                .iter()
                .map(|b| (format!("{:.0}–{:.0}", b.start, b.end), b.count as f64))
                .collect(),
            ChartData::Bars(bars) => bars.iter().map(|b| (b.label.clone(), b.value)).collect(),
        };
        if bars.is_empty() {
            let _ = writeln!(out, "(no data)");
        } else {
            draw_bars(&mut out, &bars, width);
        }
        if let Some(pb) = &self.price_bands {
            let _ = writeln!(out, "\nFree vs paid (JPY): free {} / paid {}", pb.free, pb.paid);
            let bands: Vec<(String, f64)> = pb
                .bands
                .iter()
                .map(|b| (b.label.to_string(), b.count as f64))
                .collect();
            draw_bars(&mut out, &bands, width);
        }
        out
    }
}

fn draw_bars(out: &mut String, bars: &[(String, f64)], width: usize) {
    let label_w = bars.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let peak = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    for (label, value) in bars {
        let len = if peak > 0.0 {
            ((value / peak) * width as f64).round() as usize
        } else {
            0
        };
        let pad = label_w - label.chars().count();
        let _ = writeln!(
            out,
            "{label}{} | {} {value}",
            " ".repeat(pad),
            "█".repeat(len)
        );
    }
}
