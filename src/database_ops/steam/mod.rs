// Steam storefront: appdetails download, extraction, raw-directory ingest.

pub mod extract;
pub mod fetch;
pub mod ingest;
