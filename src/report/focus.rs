//! Focus-driven shaping of the filtered game table.
//!
//! [`transform`] is the single place that decides what a focus means. The
//! chart renderer and the prompt builder both consume the resulting
//! [`FocusView`], so they always describe the same data.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::database_ops::db::GameRow;
use crate::normalization::platform::split_platforms;
use crate::normalization::release_date::release_year;

/// Row cap for the price, review-count and fallback views.
pub const TOP_ROWS: usize = 50;
/// Row cap for the developer ranking.
pub const TOP_DEVELOPERS: usize = 20;

/// Analysis angle for a report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Focus {
    Price,
    ReviewCount,
    ReleaseYear,
    IsFree,
    RequiredAge,
    Developer,
    Platform,
    /// Anything unrecognized; keeps the caller's label for display.
    Other(String),
}

impl Focus {
    pub const KNOWN: [Focus; 7] = [
        Focus::Price,
        Focus::ReviewCount,
        Focus::ReleaseYear,
        Focus::IsFree,
        Focus::RequiredAge,
        Focus::Developer,
        Focus::Platform,
    ];

    /// Accepts the snake_case keys, a few aliases and the storefront UI's
    /// Japanese labels. Never fails.
    pub fn parse(raw: &str) -> Focus {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "price" | "価格" => Focus::Price,
            "review_count" | "reviews" | "recommendations" | "レビュー数" => Focus::ReviewCount,
            "release_year" | "year" | "リリース年" => Focus::ReleaseYear,
            "is_free" | "free" | "無料かどうか" => Focus::IsFree,
            "required_age" | "age" | "年齢制限" => Focus::RequiredAge,
            "developer" | "developers" | "開発会社" => Focus::Developer,
            "platform" | "platforms" | "プラットフォーム" => Focus::Platform,
            _ => Focus::Other(raw.trim().to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Focus::Price => "price",
            Focus::ReviewCount => "review_count",
            Focus::ReleaseYear => "release_year",
            Focus::IsFree => "is_free",
            Focus::RequiredAge => "required_age",
            Focus::Developer => "developer",
            Focus::Platform => "platform",
            Focus::Other(label) => label,
        }
    }

    /// Human-readable label used in prompts and report titles.
    pub fn label(&self) -> &str {
        match self {
            Focus::Price => "price",
            Focus::ReviewCount => "review count",
            Focus::ReleaseYear => "release year",
            Focus::IsFree => "free vs paid",
            Focus::RequiredAge => "age rating",
            Focus::Developer => "developer",
            Focus::Platform => "platform",
            Focus::Other(label) => label,
        }
    }
}

impl FromStr for Focus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Focus::parse(s))
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A row that survived release-year derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedRow {
    pub year: i32,
    pub row: GameRow,
}

/// Per-group aggregate for the grouped views.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats<K> {
    pub key: K,
    pub count: usize,
    pub mean_price: f64,
    pub mean_recommendations: f64,
}

/// A label with the number of games it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

/// The focus-specific derived table.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusView {
    /// Cheapest first, capped at [`TOP_ROWS`].
    Price(Vec<GameRow>),
    /// Most recommended first, capped at [`TOP_ROWS`].
    ReviewCount(Vec<GameRow>),
    /// Every row with a parsable release date, input order.
    ReleaseYear(Vec<DatedRow>),
    IsFree(Vec<GroupStats<bool>>),
    RequiredAge(Vec<GroupStats<i64>>),
    Developer(Vec<NamedCount>),
    Platform(Vec<NamedCount>),
    /// Unrecognized focus: first [`TOP_ROWS`] rows as given.
    Sample(Vec<GameRow>),
}

impl FocusView {
    pub fn len(&self) -> usize {
        match self {
            FocusView::Price(v) | FocusView::ReviewCount(v) | FocusView::Sample(v) => v.len(),
            FocusView::ReleaseYear(v) => v.len(),
            FocusView::IsFree(v) => v.len(),
            FocusView::RequiredAge(v) => v.len(),
            FocusView::Developer(v) | FocusView::Platform(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JPY band breakdown of the price view's rows; `None` for other views.
    pub fn price_bands(&self) -> Option<PriceBands> {
        match self {
            FocusView::Price(rows) => Some(price_bands(rows)),
            _ => None,
        }
    }

    /// Column headers and stringified cells, shared by the prompt text and
    /// CSV export.
    pub fn table(&self) -> Table {
        match self {
            FocusView::Price(rows) | FocusView::ReviewCount(rows) | FocusView::Sample(rows) => {
                Table {
                    headers: GAME_COLUMNS.to_vec(),
                    rows: rows.iter().map(game_cells).collect(),
                }
            }
            FocusView::ReleaseYear(rows) => {
                let mut headers = GAME_COLUMNS.to_vec();
                headers.push("year");
                Table {
                    headers,
                    rows: rows
                        .iter()
                        .map(|d| {
                            let mut cells = game_cells(&d.row);
                            cells.push(d.year.to_string());
                            cells
                        })
                        .collect(),
                }
            }
            FocusView::IsFree(groups) => group_table("is_free", groups),
            FocusView::RequiredAge(groups) => group_table("required_age", groups),
            FocusView::Developer(counts) => count_table("developers", counts),
            FocusView::Platform(counts) => count_table("platform", counts),
        }
    }
}

/// Free/paid split plus paid games per JPY band, from `price_jpy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceBands {
    /// `price_jpy == 0`.
    pub free: usize,
    /// `price_jpy > 0`; these are the games spread over `bands`.
    pub paid: usize,
    pub bands: Vec<PriceBand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceBand {
    pub label: &'static str,
    pub count: usize,
}

/// Inclusive upper bounds; anything above the last one lands in the open band.
const PRICE_BAND_LIMITS: [(i64, &str); 5] = [
    (500, "1–500"),
    (1000, "501–1000"),
    (2000, "1001–2000"),
    (4000, "2001–4000"),
    (8000, "4001–8000"),
];
const PRICE_BAND_OPEN: &str = "8001+";

/// Bucket rows by `price_jpy`. Every band is listed, empty ones with 0.
pub fn price_bands(rows: &[GameRow]) -> PriceBands {
    let mut bands: Vec<PriceBand> = PRICE_BAND_LIMITS
        .iter()
        .map(|&(_, label)| label)
        .chain(std::iter::once(PRICE_BAND_OPEN))
        .map(|label| PriceBand { label, count: 0 })
        .collect();
    let mut free = 0;
    let mut paid = 0;
    for r in rows {
        match r.price_jpy {
            0 => free += 1,
            jpy if jpy > 0 => {
                paid += 1;
                let idx = PRICE_BAND_LIMITS
                    .iter()
                    .position(|&(upper, _)| jpy <= upper)
                    .unwrap_or(PRICE_BAND_LIMITS.len());
                bands[idx].count += 1;
            }
            _ => {}
        }
    }
    PriceBands { free, paid, bands }
}

impl PriceBands {
    pub fn table(&self) -> Table {
        let mut rows = vec![
            vec!["free".to_string(), self.free.to_string()],
            vec!["paid".to_string(), self.paid.to_string()],
        ];
        rows.extend(
            self.bands
                .iter()
                .map(|b| vec![format!("paid {} JPY", b.label), b.count.to_string()]),
        );
        Table {
            headers: vec!["price_band", "games"],
            rows,
        }
    }
}

/// Plain tabular form of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

const GAME_COLUMNS: [&str; 13] = [
    "app_id",
    "name",
    "price",
    "price_jpy",
    "genres",
    "release_date",
    "recommendations",
    "developers",
    "publishers",
    "platforms",
    "required_age",
    "is_free",
    "country",
];

fn game_cells(r: &GameRow) -> Vec<String> {
    vec![
        r.app_id.to_string(),
        r.name.clone().unwrap_or_default(),
        format!("{:.2}", r.price),
        r.price_jpy.to_string(),
        r.genres.clone(),
        r.release_date.clone().unwrap_or_default(),
        r.recommendations.to_string(),
        r.developers.clone(),
        r.publishers.clone(),
        r.platforms.clone(),
        r.required_age.to_string(),
        r.is_free.to_string(),
        r.country.clone(),
    ]
}

fn group_table<K: ToString>(key: &'static str, groups: &[GroupStats<K>]) -> Table {
    Table {
        headers: vec![key, "games", "mean_price", "mean_recommendations"],
        rows: groups
            .iter()
            .map(|g| {
                vec![
                    g.key.to_string(),
                    g.count.to_string(),
                    format!("{:.2}", g.mean_price),
                    format!("{:.2}", g.mean_recommendations),
                ]
            })
            .collect(),
    }
}

fn count_table(key: &'static str, counts: &[NamedCount]) -> Table {
    Table {
        headers: vec![key, "games"],
        rows: counts
            .iter()
            .map(|c| vec![c.name.clone(), c.count.to_string()])
            .collect(),
    }
}

/// Shape `rows` for `focus`. Empty input yields an empty view of the same kind.
pub fn transform(rows: &[GameRow], focus: &Focus) -> FocusView {
    match focus {
        Focus::Price => {
            let mut sorted = rows.to_vec();
            // `sort_by` is stable: equal prices keep input order.
            sorted.sort_by(|a, b| a.price.total_cmp(&b.price));
            sorted.truncate(TOP_ROWS);
            FocusView::Price(sorted)
        }
        Focus::ReviewCount => {
            let mut sorted = rows.to_vec();
            sorted.sort_by(|a, b| b.recommendations.cmp(&a.recommendations));
            sorted.truncate(TOP_ROWS);
            FocusView::ReviewCount(sorted)
        }
        Focus::ReleaseYear => FocusView::ReleaseYear(
            rows.iter()
                .filter_map(|r| {
                    let year = release_year(r.release_date.as_deref()?)?;
                    Some(DatedRow {
                        year,
                        row: r.clone(),
                    })
                })
                .collect(),
        ),
        Focus::IsFree => FocusView::IsFree(group_by(rows, |r| r.is_free)),
        Focus::RequiredAge => FocusView::RequiredAge(group_by(rows, |r| r.required_age)),
        Focus::Developer => {
            let mut counts = count_by(rows.iter().map(|r| r.developers.as_str()));
            counts.truncate(TOP_DEVELOPERS);
            FocusView::Developer(counts)
        }
        Focus::Platform => {
            let mut counts = count_by(rows.iter().flat_map(|r| split_platforms(&r.platforms)));
            // Re-rank with alphabetical tie-break so output doesn't depend on row order.
            counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
            FocusView::Platform(counts)
        }
        Focus::Other(_) => FocusView::Sample(rows.iter().take(TOP_ROWS).cloned().collect()),
    }
}

/// Group ascending by key with count and arithmetic means.
fn group_by<K, F>(rows: &[GameRow], key_of: F) -> Vec<GroupStats<K>>
where
    K: Ord + Clone,
    F: Fn(&GameRow) -> K,
{
    struct Acc {
        count: usize,
        price_sum: f64,
        reco_sum: f64,
    }
    let mut groups: BTreeMap<K, Acc> = BTreeMap::new();
    for r in rows {
        let acc = groups.entry(key_of(r)).or_insert(Acc {
            count: 0,
            price_sum: 0.0,
            reco_sum: 0.0,
        });
        acc.count += 1;
        acc.price_sum += r.price;
        acc.reco_sum += r.recommendations as f64;
    }
    groups
        .into_iter()
        .map(|(key, acc)| GroupStats {
            key,
            count: acc.count,
            mean_price: acc.price_sum / acc.count as f64,
            mean_recommendations: acc.reco_sum / acc.count as f64,
        })
        .collect()
}

/// Count occurrences, descending by count; ties keep first-appearance order.
fn count_by<'a>(names: impl Iterator<Item = &'a str>) -> Vec<NamedCount> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for name in names {
        *counts.entry(name).or_insert(0) += 1;
    }
    let mut out: Vec<NamedCount> = counts
        .into_iter()
        .map(|(name, count)| NamedCount {
            name: name.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}
