//! Headline numbers for each dashboard table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::{number_field, Record};
use crate::store::{DashboardTable, RowStore};
use crate::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesKpis {
    pub days: usize,
    pub total_revenue: f64,
    pub total_orders: f64,
    pub avg_conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficKpis {
    pub days: usize,
    pub total_visitors: f64,
    pub total_page_views: f64,
    pub avg_bounce_rate: f64,
    pub avg_session_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub date: String,
    pub value: Option<f64>,
    pub target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum KpiSummary {
    SalesData(SalesKpis),
    TrafficData(TrafficKpis),
    PerformanceMetrics { metrics: BTreeMap<String, MetricSnapshot> },
}

fn total(batch: &[Record], field: &str) -> f64 {
    batch.iter().filter_map(|r| number_field(r, field)).sum()
}

fn average(batch: &[Record], field: &str) -> f64 {
    if batch.is_empty() {
        return 0.0;
    }
    total(batch, field) / batch.len() as f64
}

pub fn summarize(table: DashboardTable, batch: &[Record]) -> KpiSummary {
    match table {
        DashboardTable::SalesData => KpiSummary::SalesData(SalesKpis {
            days: batch.len(),
            total_revenue: total(batch, "revenue"),
            total_orders: total(batch, "orders"),
            avg_conversion_rate: average(batch, "conversion_rate"),
        }),
        DashboardTable::TrafficData => KpiSummary::TrafficData(TrafficKpis {
            days: batch.len(),
            total_visitors: total(batch, "visitors"),
            total_page_views: total(batch, "page_views"),
            avg_bounce_rate: average(batch, "bounce_rate"),
            avg_session_duration: average(batch, "avg_session_duration"),
        }),
        DashboardTable::PerformanceMetrics => KpiSummary::PerformanceMetrics {
            metrics: latest_metrics(batch),
        },
    }
}

/// Latest row per `metric_name` by `date`. On equal dates the first row seen
/// wins.
fn latest_metrics(batch: &[Record]) -> BTreeMap<String, MetricSnapshot> {
    let mut latest: BTreeMap<String, MetricSnapshot> = BTreeMap::new();
    for record in batch {
        let Some(name) = record.get("metric_name").and_then(|v| v.as_str()) else {
            continue;
        };
        let date = record
            .get("date")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if latest
            .get(name)
            .is_some_and(|seen| seen.date.as_str() >= date)
        {
            continue;
        }
        latest.insert(
            name.to_string(),
            MetricSnapshot {
                date: date.to_string(),
                value: number_field(record, "metric_value"),
                target: number_field(record, "target_value"),
            },
        );
    }
    latest
}

pub async fn load(store: &dyn RowStore, table: DashboardTable) -> AppResult<KpiSummary> {
    let rows = store
        .fetch_rows(table)
        .await
        .map_err(|err| err.with_context("operation", "kpi_fetch"))?;
    Ok(summarize(table, &rows))
}
