pub mod platform;
pub mod release_date;
