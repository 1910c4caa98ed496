#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bizdash_lib::migrate;
use bizdash_lib::record::{Batch, Record};
use bizdash_lib::store::{DashboardTable, RowStore, SqliteStore};
use bizdash_lib::AppResult;
use sqlx::sqlite::SqlitePoolOptions;

pub async fn memory_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect sqlite::memory:");
    migrate::apply_migrations(&pool)
        .await
        .expect("apply migrations");
    SqliteStore::new(pool)
}

pub fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().expect("object literal")
}

/// Wraps a store and counts calls that reach `insert_rows`.
pub struct CountingStore<S> {
    pub inner: S,
    inserts: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: RowStore> RowStore for CountingStore<S> {
    async fn fetch_rows(&self, table: DashboardTable) -> AppResult<Batch> {
        self.inner.fetch_rows(table).await
    }

    async fn insert_rows(&self, table: DashboardTable, rows: Batch) -> AppResult<u64> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_rows(table, rows).await
    }

    async fn clear_table(&self, table: DashboardTable) -> AppResult<u64> {
        self.inner.clear_table(table).await
    }

    async fn count_rows(&self, table: DashboardTable) -> AppResult<u64> {
        self.inner.count_rows(table).await
    }
}
