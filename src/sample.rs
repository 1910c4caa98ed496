//! Reproducible demo rows for the dashboard tables.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::record::{Batch, Record};
use crate::store::{DashboardTable, RowStore};
use crate::time::iso_date;
use crate::{AppError, AppResult};

pub const MAX_DAYS: u32 = 365;
pub const DEFAULT_DAYS: u32 = 30;

/// `(metric_name, low, span, target)`
const PERFORMANCE_METRICS: [(&str, f64, f64, f64); 3] = [
    ("Customer Satisfaction", 4.0, 1.0, 4.5),
    ("Response Time", 1.0, 2.0, 2.0),
    ("Uptime", 98.0, 2.0, 99.9),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    #[default]
    All,
    Sales,
    Traffic,
    Performance,
}

impl SampleKind {
    pub fn tables(self) -> &'static [DashboardTable] {
        match self {
            SampleKind::All => &DashboardTable::ALL,
            SampleKind::Sales => &[DashboardTable::SalesData],
            SampleKind::Traffic => &[DashboardTable::TrafficData],
            SampleKind::Performance => &[DashboardTable::PerformanceMetrics],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SampleKind::All => "all",
            SampleKind::Sales => "sales",
            SampleKind::Traffic => "traffic",
            SampleKind::Performance => "performance",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SampleKind::All),
            "sales" => Ok(SampleKind::Sales),
            "traffic" => Ok(SampleKind::Traffic),
            "performance" => Ok(SampleKind::Performance),
            _ => Err(AppError::new("SAMPLE/UNKNOWN_KIND", "Unknown sample data kind")
                .with_context("kind", s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: DashboardTable,
    pub rows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleReport {
    pub kind: SampleKind,
    pub tables: Vec<TableCount>,
}

impl SampleReport {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// A value in `[0, 1)` derived from the hash of `(table, date, field)`.
fn unit(table: DashboardTable, date: &str, field: &str) -> f64 {
    let digest = Sha256::new()
        .chain_update(table.as_str())
        .chain_update([0u8])
        .chain_update(date)
        .chain_update([0u8])
        .chain_update(field)
        .finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
}

/// An integer in `low..low + span`.
fn whole(table: DashboardTable, date: &str, field: &str, low: i64, span: i64) -> Value {
    let step = ((unit(table, date, field) * span as f64).floor() as i64).min(span - 1);
    Value::from(low + step)
}

/// A value in `low..low + span`, floored to hundredths.
fn ratio(table: DashboardTable, date: &str, field: &str, low: f64, span: f64) -> Value {
    let max_cents = ((low + span) * 100.0).round() - 1.0;
    let cents = ((low + unit(table, date, field) * span) * 100.0)
        .floor()
        .min(max_cents);
    Value::from(cents / 100.0)
}

fn row(pairs: Vec<(&str, Value)>) -> Record {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Builds the rows `generate` would insert for one table, without touching
/// a store.
pub fn sample_rows(table: DashboardTable, days: u32, today: NaiveDate) -> Batch {
    let start = today - Days::new(u64::from(days));
    let mut batch = Batch::new();
    for offset in 0..days {
        let date = iso_date(start + Days::new(u64::from(offset)));
        let d = date.as_str();
        match table {
            DashboardTable::SalesData => batch.push(row(vec![
                ("date", Value::from(d)),
                ("revenue", whole(table, d, "revenue", 10_000, 50_000)),
                ("orders", whole(table, d, "orders", 20, 100)),
                ("conversion_rate", ratio(table, d, "conversion_rate", 2.0, 5.0)),
            ])),
            DashboardTable::TrafficData => batch.push(row(vec![
                ("date", Value::from(d)),
                ("visitors", whole(table, d, "visitors", 1_000, 5_000)),
                ("page_views", whole(table, d, "page_views", 3_000, 15_000)),
                ("bounce_rate", ratio(table, d, "bounce_rate", 20.0, 30.0)),
                (
                    "avg_session_duration",
                    whole(table, d, "avg_session_duration", 60, 300),
                ),
            ])),
            DashboardTable::PerformanceMetrics => {
                for (name, low, span, target) in PERFORMANCE_METRICS {
                    batch.push(row(vec![
                        ("date", Value::from(d)),
                        ("metric_name", Value::from(name)),
                        ("metric_value", ratio(table, d, name, low, span)),
                        ("target_value", Value::from(target)),
                    ]));
                }
            }
        }
    }
    batch
}

pub async fn generate(
    store: &dyn RowStore,
    kind: SampleKind,
    days: u32,
    today: NaiveDate,
) -> AppResult<SampleReport> {
    if days == 0 || days > MAX_DAYS {
        return Err(AppError::new(
            "SAMPLE/INVALID_COUNT",
            format!("Days must be between 1 and {MAX_DAYS}"),
        )
        .with_context("days", days.to_string()));
    }

    let mut tables = Vec::new();
    for &table in kind.tables() {
        let rows = store
            .insert_rows(table, sample_rows(table, days, today))
            .await
            .map_err(|err| err.with_context("operation", "generate_sample"))?;
        info!(
            target: "bizdash",
            event = "sample_generated",
            table = table.as_str(),
            rows,
            days
        );
        tables.push(TableCount { table, rows });
    }
    Ok(SampleReport { kind, tables })
}

pub async fn clear(store: &dyn RowStore, kind: SampleKind) -> AppResult<SampleReport> {
    let mut tables = Vec::new();
    for &table in kind.tables() {
        let rows = store
            .clear_table(table)
            .await
            .map_err(|err| err.with_context("operation", "clear_sample"))?;
        tables.push(TableCount { table, rows });
    }
    Ok(SampleReport { kind, tables })
}
