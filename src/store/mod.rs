//! Row storage boundary.
//!
//! The transfer, sample and KPI layers only see [`RowStore`]; the SQLite
//! implementation in [`sqlite`] stands in for the hosted backend and owns
//! the `id`, `created_at` and `updated_at` columns.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::Batch;
use crate::{AppError, AppResult};

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Tables the dashboard reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardTable {
    SalesData,
    TrafficData,
    PerformanceMetrics,
}

impl DashboardTable {
    pub const ALL: [DashboardTable; 3] = [
        DashboardTable::SalesData,
        DashboardTable::TrafficData,
        DashboardTable::PerformanceMetrics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DashboardTable::SalesData => "sales_data",
            DashboardTable::TrafficData => "traffic_data",
            DashboardTable::PerformanceMetrics => "performance_metrics",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DashboardTable::SalesData => "Sales Data",
            DashboardTable::TrafficData => "Traffic Data",
            DashboardTable::PerformanceMetrics => "Performance Metrics",
        }
    }
}

impl fmt::Display for DashboardTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DashboardTable {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == wanted)
            .ok_or_else(|| {
                AppError::new("STORE/UNKNOWN_TABLE", format!("Unknown table: {wanted}"))
                    .with_context("table", wanted.to_string())
            })
    }
}

/// Opaque key/value row storage for the dashboard tables.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// All rows of `table`, newest `created_at` first.
    async fn fetch_rows(&self, table: DashboardTable) -> AppResult<Batch>;

    /// Inserts `rows` as one unit and returns how many were written. The
    /// store assigns `id`, `created_at` and `updated_at`.
    async fn insert_rows(&self, table: DashboardTable, rows: Batch) -> AppResult<u64>;

    /// Deletes every row of `table` and returns how many were removed.
    async fn clear_table(&self, table: DashboardTable) -> AppResult<u64>;

    async fn count_rows(&self, table: DashboardTable) -> AppResult<u64>;
}
