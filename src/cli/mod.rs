// Subcommand implementations for the `steam_report` binary.
// Each module exposes a config struct and an async `run`.

pub mod db_counts;
pub mod fetch;
pub mod ingest;
pub mod report;
