// Storage side of the pipeline: canonical rows, FX table, Steam raw data.

pub mod db;
pub mod exchange;
pub mod steam;
