use std::fmt;

use serde::Serialize;

use crate::kpi::KpiSummary;
use crate::sample::SampleReport;
use crate::transfer::{ExportArtifact, ImportSummary};
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Destructive,
}

/// What the user was doing when a notice was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Export,
    Import,
    GenerateSample,
    ClearSample,
    Summarize,
    ListTables,
    OpenDatabase,
}

impl Action {
    fn failure_title(self) -> &'static str {
        match self {
            Action::Export => "Export failed",
            Action::Import => "Import failed",
            Action::GenerateSample => "Sample generation failed",
            Action::ClearSample => "Clearing data failed",
            Action::Summarize => "Summary failed",
            Action::ListTables => "Listing tables failed",
            Action::OpenDatabase => "Database unavailable",
        }
    }
}

/// Outcome shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn exported(artifact: &ExportArtifact) -> Self {
        Self::info(
            "Data exported",
            format!(
                "Successfully exported {} records from {}.",
                artifact.record_count,
                artifact.table.label()
            ),
        )
    }

    pub fn imported(summary: &ImportSummary) -> Self {
        Self::info(
            "Data imported",
            format!(
                "Successfully imported {} records to {}.",
                summary.inserted,
                summary.table.label()
            ),
        )
    }

    pub fn sample_generated(report: &SampleReport) -> Self {
        Self::info(
            "Sample data generated",
            format!(
                "Inserted {} rows across {} table(s).",
                report.total_rows(),
                report.tables.len()
            ),
        )
    }

    pub fn sample_cleared(report: &SampleReport) -> Self {
        Self::info(
            "Data cleared",
            format!(
                "Removed {} rows across {} table(s).",
                report.total_rows(),
                report.tables.len()
            ),
        )
    }

    pub fn summarized(summary: &KpiSummary) -> Self {
        let label = match summary {
            KpiSummary::SalesData(_) => "Sales Data",
            KpiSummary::TrafficData(_) => "Traffic Data",
            KpiSummary::PerformanceMetrics { .. } => "Performance Metrics",
        };
        Self::info("Summary ready", format!("Computed KPIs for {label}."))
    }

    /// Failure notice. Exporting an empty table gets its own wording; every
    /// other error passes its message through.
    pub fn failure(action: Action, err: &AppError) -> Self {
        let (title, description) = match (action, err.kind()) {
            (Action::Export, ErrorKind::NoData) => {
                let table = err
                    .context()
                    .get("table")
                    .cloned()
                    .unwrap_or_else(|| "this table".to_string());
                (
                    "No data to export".to_string(),
                    format!("No records found in {table}."),
                )
            }
            (Action::Import, ErrorKind::UnsupportedFormat) => (
                action.failure_title().to_string(),
                "Unsupported file format. Please use CSV or JSON files.".to_string(),
            ),
            _ => (action.failure_title().to_string(), err.message().to_string()),
        };
        Self {
            title,
            description,
            severity: Severity::Destructive,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Destructive
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DashboardTable;
    use crate::transcode::{FileFormat, TranscodeError};

    #[test]
    fn export_without_rows_names_the_table() {
        let err = AppError::from(TranscodeError::NoData).with_context("table", "sales_data");
        let notice = Notice::failure(Action::Export, &err);
        assert_eq!(notice.title, "No data to export");
        assert_eq!(notice.description, "No records found in sales_data.");
        assert!(notice.is_error());
    }

    #[test]
    fn backend_message_is_passed_through() {
        let err = AppError::new("SQLX/CONSTRAINT", "NOT NULL constraint failed: sales_data.date");
        let notice = Notice::failure(Action::Import, &err);
        assert_eq!(
            notice.to_string(),
            "Import failed: NOT NULL constraint failed: sales_data.date"
        );
    }

    #[test]
    fn database_failures_have_their_own_title() {
        let err = AppError::new("IO/NotADirectory", "Not a directory (os error 20)");
        let notice = Notice::failure(Action::OpenDatabase, &err);
        assert_eq!(
            notice.to_string(),
            "Database unavailable: Not a directory (os error 20)"
        );
        assert!(notice.is_error());
    }

    #[test]
    fn unsupported_format_reads_like_a_hint() {
        let err = AppError::from(TranscodeError::UnsupportedFormat("a.txt".into()));
        let notice = Notice::failure(Action::Import, &err);
        assert_eq!(
            notice.description,
            "Unsupported file format. Please use CSV or JSON files."
        );
    }

    #[test]
    fn success_notices_count_records() {
        let summary = ImportSummary {
            table: DashboardTable::TrafficData,
            file_name: "t.json".into(),
            format: FileFormat::Json,
            inserted: 4,
        };
        let notice = Notice::imported(&summary);
        assert_eq!(notice.severity, Severity::Info);
        assert_eq!(
            notice.description,
            "Successfully imported 4 records to Traffic Data."
        );
    }
}
