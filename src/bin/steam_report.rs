use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use steam_report::cli;
use steam_report::config::AppConfig;
use steam_report::report::Focus;
use steam_report::util::env;
use steam_report::util::tracing::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "steam_report", version, about = "Steam storefront report CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Download appdetails JSON for popular apps per country
    Fetch {
        /// Comma-separated country codes (defaults to STEAM_COUNTRIES)
        #[arg(long, value_delimiter = ',')]
        countries: Option<Vec<String>>,
        /// Number of apps taken from the popular app id CSV
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum recommendation total for a response to be kept
        #[arg(long)]
        threshold: Option<i64>,
    },
    /// Rebuild the games table from the raw JSON directory
    Ingest {
        #[arg(long)]
        raw_dir: Option<PathBuf>,
        #[arg(long)]
        db: Option<PathBuf>,
        /// Clear the table even when no rows were extracted
        #[arg(long, default_value_t = false)]
        allow_empty: bool,
    },
    /// Build a chart, prompt and summary for one focus
    Report {
        /// price, review_count, release_year, is_free, required_age, developer, platform
        #[arg(long)]
        focus: Focus,
        #[arg(long, value_delimiter = ',')]
        countries: Option<Vec<String>>,
        /// Extra question for the summary
        #[arg(long)]
        query: Option<String>,
        /// Use a placeholder summary instead of calling Gemini
        #[arg(long, default_value_t = false)]
        no_ai: bool,
        /// Request a plain-text summary instead of Markdown
        #[arg(long, default_value_t = false)]
        plain: bool,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also export the focus view as CSV
        #[arg(long, default_value_t = false)]
        csv: bool,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print row counts per country in the store
    Counts {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn normalize_countries(raw: Option<Vec<String>>, fallback: &[String]) -> Vec<String> {
    let list: Vec<String> = raw
        .unwrap_or_default()
        .iter()
        .flat_map(|c| env::split_list(c))
        .collect();
    if list.is_empty() {
        fallback.to_vec()
    } else {
        list
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    init_tracing("info")?;
    let cfg = AppConfig::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            countries,
            limit,
            threshold,
        } => {
            AppConfig::log_snapshot("fetch", &[])?;
            let mut fetch = cfg.fetch.clone();
            if let Some(n) = limit {
                fetch.limit = n;
            }
            if let Some(t) = threshold {
                fetch.min_recommendations = t;
            }
            cli::fetch::run(cli::fetch::FetchRunConfig {
                countries: normalize_countries(countries, &cfg.countries),
                raw_dir: cfg.raw_dir.clone(),
                fetch,
            })
            .await?;
        }
        Commands::Ingest {
            raw_dir,
            db,
            allow_empty,
        } => {
            AppConfig::log_snapshot("ingest", &[])?;
            cli::ingest::run(cli::ingest::IngestConfig {
                raw_dir: raw_dir.unwrap_or(cfg.raw_dir),
                db_path: db.unwrap_or(cfg.db_path),
                rates: cfg.rates,
                allow_empty,
            })
            .await?;
        }
        Commands::Report {
            focus,
            countries,
            query,
            no_ai,
            plain,
            out,
            csv,
            db,
        } => {
            let no_ai = no_ai || env::env_flag("REPORT_NO_AI", false);
            let required: &[&str] = if no_ai { &[] } else { &["GEMINI_API_KEY"] };
            AppConfig::log_snapshot("report", required)?;
            cli::report::run(cli::report::ReportConfig {
                db_path: db.unwrap_or(cfg.db_path),
                countries: normalize_countries(countries, &cfg.countries),
                focus,
                query,
                no_ai,
                plain,
                out_dir: out.unwrap_or(cfg.report_out_dir),
                csv,
                gemini: cfg.gemini,
            })
            .await?;
        }
        Commands::Counts { db } => {
            cli::db_counts::run(cli::db_counts::DbCountsConfig {
                db_path: db.unwrap_or(cfg.db_path),
            })
            .await?;
        }
    }
    Ok(())
}
