//! Report stage: country filter, focus shaping, chart, prompt, summary, export.

pub mod chart;
pub mod export;
pub mod filter;
pub mod focus;
pub mod pipeline;
pub mod prompt;
pub mod summarize;

pub use focus::{transform, Focus, FocusView};
pub use pipeline::{generate_report, prepare_report, Preparation, PreparedReport};
