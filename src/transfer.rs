//! Table export and file import on top of a [`RowStore`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::record::{strip_backend_owned, Batch};
use crate::store::{DashboardTable, RowStore};
use crate::time::iso_date;
use crate::transcode::{FileFormat, TranscodeError};
use crate::{db, AppError, AppResult};

/// An encoded table, ready to be saved or offered for download.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub table: DashboardTable,
    pub format: FileFormat,
    pub file_name: String,
    pub mime_type: &'static str,
    pub record_count: usize,
    #[serde(skip)]
    pub contents: String,
}

impl ExportArtifact {
    /// Saves the artifact as `<dir>/<file_name>`, replacing any previous file.
    pub fn write_to(&self, dir: &Path) -> AppResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "create_export_dir")
                .with_context("path", dir.display().to_string())
        })?;
        let path = dir.join(&self.file_name);
        db::write_atomic(&path, self.contents.as_bytes()).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "write_export")
                .with_context("path", path.display().to_string())
        })?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub table: DashboardTable,
    pub file_name: String,
    pub format: FileFormat,
    pub inserted: u64,
}

/// `<table>_export_<YYYY-MM-DD>.<ext>`
pub fn export_file_name(table: DashboardTable, format: FileFormat, date: NaiveDate) -> String {
    format!(
        "{}_export_{}.{}",
        table.as_str(),
        iso_date(date),
        format.extension()
    )
}

/// Reads every row of `table` and encodes it. An empty table is an error
/// rather than a header-only or `[]` file.
pub async fn export_table(
    store: &dyn RowStore,
    table: DashboardTable,
    format: FileFormat,
    date: NaiveDate,
) -> AppResult<ExportArtifact> {
    let rows = store
        .fetch_rows(table)
        .await
        .map_err(|err| err.with_context("operation", "export_fetch"))?;
    if rows.is_empty() {
        warn!(target: "bizdash", event = "export_no_data", table = table.as_str());
        return Err(AppError::from(TranscodeError::NoData).with_context("table", table.as_str()));
    }

    let contents = format.encode(&rows).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "export_encode")
            .with_context("table", table.as_str())
    })?;

    info!(
        target: "bizdash",
        event = "export_complete",
        table = table.as_str(),
        format = format.extension(),
        records = rows.len()
    );

    Ok(ExportArtifact {
        table,
        format,
        file_name: export_file_name(table, format, date),
        mime_type: format.mime_type(),
        record_count: rows.len(),
        contents,
    })
}

/// Drops `id`, `created_at` and `updated_at` from every record so the store
/// can assign them.
pub fn sanitize_for_import(batch: Batch) -> Batch {
    batch.into_iter().map(strip_backend_owned).collect()
}

/// Picks the decoder from `file_name`, decodes `text` and sanitizes the
/// result. Nothing is parsed when the extension is unsupported.
pub fn decode_import(file_name: &str, text: &str) -> AppResult<(FileFormat, Batch)> {
    let format = FileFormat::from_file_name(file_name).map_err(AppError::from)?;
    let batch = format
        .decode(text)
        .map_err(|err| AppError::from(err).with_context("file_name", file_name.to_string()))?;
    Ok((format, sanitize_for_import(batch)))
}

/// Imports already-loaded file text into `table` in a single insert.
pub async fn import_file(
    store: &dyn RowStore,
    table: DashboardTable,
    file_name: &str,
    text: &str,
) -> AppResult<ImportSummary> {
    let (format, batch) = decode_import(file_name, text)?;
    if batch.is_empty() {
        return Err(AppError::new(AppError::NO_DATA_CODE, "No records found in file")
            .with_context("file_name", file_name.to_string()));
    }

    let inserted = store
        .insert_rows(table, batch)
        .await
        .map_err(|err| err.with_context("file_name", file_name.to_string()))?;

    info!(
        target: "bizdash",
        event = "import_complete",
        table = table.as_str(),
        format = format.extension(),
        inserted
    );

    Ok(ImportSummary {
        table,
        file_name: file_name.to_string(),
        format,
        inserted,
    })
}

/// Reads the file at `path` fully into memory and imports it. The bytes must
/// be UTF-8.
pub async fn import_path(
    store: &dyn RowStore,
    table: DashboardTable,
    path: &Path,
) -> AppResult<ImportSummary> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    FileFormat::from_file_name(&file_name).map_err(AppError::from)?;

    let bytes = fs::read(path).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "read_import_file")
            .with_context("path", path.display().to_string())
    })?;
    let text = String::from_utf8(bytes).map_err(|err| {
        AppError::from(TranscodeError::from(err)).with_context("file_name", file_name.clone())
    })?;
    import_file(store, table, &file_name, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    #[test]
    fn file_name_uses_table_date_and_extension() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert_eq!(
            export_file_name(DashboardTable::SalesData, FileFormat::Csv, date),
            "sales_data_export_2024-05-09.csv"
        );
        assert_eq!(
            export_file_name(DashboardTable::PerformanceMetrics, FileFormat::Json, date),
            "performance_metrics_export_2024-05-09.json"
        );
    }

    #[test]
    fn sanitize_strips_only_backend_owned_fields() {
        let batch = vec![json!({
            "id": "abc",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "date": "2024-01-01",
            "revenue": 100
        })
        .as_object()
        .cloned()
        .unwrap()];

        let clean = sanitize_for_import(batch);
        assert_eq!(
            clean[0],
            json!({"date": "2024-01-01", "revenue": 100})
                .as_object()
                .cloned()
                .unwrap()
        );
    }

    #[test]
    fn decode_import_rejects_unsupported_extension() {
        let err = decode_import("sales.txt", "date,revenue\n2024-01-01,1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn decode_import_tags_format_errors_with_file_name() {
        let err = decode_import("sales.json", "{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(
            err.context().get("file_name"),
            Some(&"sales.json".to_string())
        );
    }

    #[test]
    fn decode_import_sanitizes_csv() {
        let (format, batch) = decode_import(
            "sales.csv",
            "id,date,revenue,created_at,updated_at\nr1,2024-01-01,100,t1,t2",
        )
        .unwrap();
        assert_eq!(format, FileFormat::Csv);
        assert_eq!(
            batch,
            vec![json!({"date": "2024-01-01", "revenue": "100"})
                .as_object()
                .cloned()
                .unwrap()]
        );
    }

    #[test]
    fn decode_import_reports_detected_format() {
        let (format, batch) =
            decode_import("Traffic.JSON", r#"{"id": 1, "visitors": 10}"#).unwrap();
        assert_eq!(format, FileFormat::Json);
        assert_eq!(batch, vec![json!({"visitors": 10}).as_object().cloned().unwrap()]);
    }
}
