//! Dashboard data transfer: CSV/JSON export and import of flat table rows,
//! sample data and KPI summaries over a local SQLite store.

pub mod config;
pub mod db;
mod error;
pub mod id;
pub mod kpi;
mod logging;
pub mod migrate;
pub mod notice;
pub mod record;
pub mod sample;
pub mod store;
pub mod time;
pub mod transcode;
pub mod transfer;

pub use error::{AppError, AppResult, ErrorKind};
pub use logging::init_logging;
