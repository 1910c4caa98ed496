use std::path::Path;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{query::Query, Column, Row, Sqlite, SqliteConnection, SqlitePool, TypeInfo, ValueRef};
use tracing::{info, warn};

use super::{DashboardTable, RowStore};
use crate::id::new_uuid_v7;
use crate::record::{strip_backend_owned, Batch, Record};
use crate::time::now_ms;
use crate::{db, migrate, AppError, AppResult};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Columns that keep an empty string as-is. In every other column an empty
/// cell (for example from a CSV export of NULL) is stored as NULL.
const TEXT_COLUMNS: [&str; 3] = ["id", "date", "metric_name"];

/// [`RowStore`] backed by a local SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wraps an existing pool. The caller is responsible for migrations.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `path` and migrates it.
    pub async fn open(path: &Path) -> AppResult<Self> {
        let pool = db::open_sqlite_pool(path).await.map_err(|err| {
            AppError::from(err)
                .with_context("operation", "open_db")
                .with_context("path", path.display().to_string())
        })?;
        migrate::apply_migrations(&pool)
            .await
            .map_err(|err| AppError::from(err).with_context("operation", "apply_migrations"))?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RowStore for SqliteStore {
    async fn fetch_rows(&self, table: DashboardTable) -> AppResult<Batch> {
        let sql = format!("SELECT * FROM {table} ORDER BY created_at DESC, rowid DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(|err| {
            AppError::from(err)
                .with_context("operation", "fetch_rows")
                .with_context("table", table.as_str())
        })?;
        Ok(rows.into_iter().map(row_to_record).collect())
    }

    async fn insert_rows(&self, table: DashboardTable, rows: Batch) -> AppResult<u64> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        info!(target: "bizdash", event = "db_tx_begin", table = table.as_str());

        let now = now_ms();
        let mut inserted = 0_u64;
        for (index, row) in rows.into_iter().enumerate() {
            if let Err(err) = insert_row(&mut tx, table, row, now).await {
                if let Err(rb) = tx.rollback().await {
                    tracing::error!(target: "bizdash", event = "db_tx_rollback_failed", error = %rb);
                } else {
                    warn!(target: "bizdash", event = "db_tx_rollback", table = table.as_str());
                }
                return Err(err
                    .with_context("operation", "insert_rows")
                    .with_context("table", table.as_str())
                    .with_context("row", index.to_string()));
            }
            inserted += 1;
        }

        tx.commit().await.map_err(AppError::from)?;
        info!(
            target: "bizdash",
            event = "db_tx_commit",
            table = table.as_str(),
            inserted
        );
        Ok(inserted)
    }

    async fn clear_table(&self, table: DashboardTable) -> AppResult<u64> {
        let sql = format!("DELETE FROM {table}");
        let result = sqlx::query(&sql).execute(&self.pool).await.map_err(|err| {
            AppError::from(err)
                .with_context("operation", "clear_table")
                .with_context("table", table.as_str())
        })?;
        info!(
            target: "bizdash",
            event = "table_cleared",
            table = table.as_str(),
            removed = result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    async fn count_rows(&self, table: DashboardTable) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                AppError::from(err)
                    .with_context("operation", "count_rows")
                    .with_context("table", table.as_str())
            })?;
        Ok(count.max(0) as u64)
    }
}

async fn insert_row(
    conn: &mut SqliteConnection,
    table: DashboardTable,
    row: Record,
    now: i64,
) -> AppResult<()> {
    let mut data = Record::new();
    data.insert("id".into(), Value::String(new_uuid_v7()));
    data.extend(strip_backend_owned(row));
    data.insert("created_at".into(), Value::from(now));
    data.insert("updated_at".into(), Value::from(now));

    for column in data.keys() {
        ensure_identifier(column)?;
    }

    let cols: Vec<&str> = data.keys().map(String::as_str).collect();
    let placeholders: Vec<&str> = cols.iter().map(|_| "?").collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        cols.join(","),
        placeholders.join(",")
    );
    let mut query = sqlx::query(&sql);
    for (column, value) in &data {
        query = match value {
            Value::String(s) if s.is_empty() && !TEXT_COLUMNS.contains(&column.as_str()) => {
                query.bind(Option::<i64>::None)
            }
            _ => bind_value(query, value),
        };
    }
    query.execute(conn).await.map_err(AppError::from)?;
    Ok(())
}

fn ensure_identifier(column: &str) -> AppResult<()> {
    if IDENTIFIER.is_match(column) {
        Ok(())
    } else {
        Err(
            AppError::new("STORE/INVALID_COLUMN", "Column name is not a valid identifier")
                .with_context("column", column.to_string()),
        )
    }
}

fn bind_value<'q>(
    q: Query<'q, Sqlite, SqliteArguments<'q>>,
    v: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match v {
        Value::Null => q.bind(Option::<i64>::None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(Option::<i64>::None)
            }
        }
        Value::Bool(b) => q.bind(*b as i64),
        Value::String(s) => q.bind(s.clone()),
        _ => q.bind(v.to_string()),
    }
}

fn row_to_record(row: SqliteRow) -> Record {
    let mut map = Record::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let val = match row.try_get_raw(idx).ok() {
            Some(raw) if raw.is_null() => Value::Null,
            Some(raw) => match raw.type_info().name() {
                "INTEGER" => row
                    .try_get::<i64, _>(idx)
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                "REAL" => row
                    .try_get::<f64, _>(idx)
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                _ => row
                    .try_get::<String, _>(idx)
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            },
            None => Value::Null,
        };
        map.insert(col.name().to_string(), val);
    }
    map
}
