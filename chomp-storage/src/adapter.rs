//! Pluggable time-series/update storage backend (spec.md §4.2), grounded on
//! `get_adapter_class`/`get_available_adapters` in `main.py` and the
//! `TsdbAdapter` literal in `src/models/base.py` of `examples/original_source`.
//!
//! The original tolerates missing optional database drivers at import time
//! and reports which adapters are actually available. We reproduce that
//! shape with an enum covering every named backend plus a constructor that
//! only succeeds for the two we carry real drivers for (sqlx's `sqlite` and
//! `postgres` features); the rest report `UnsupportedAdapter` instead of
//! failing to compile, matching the original's "degrade, don't crash"
//! philosophy.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chomp_common::{Ingester, Interval, ResourceType};

use crate::error::StorageError;
use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Sqlite,
    Timescale,
    TdEngine,
    Clickhouse,
    Duckdb,
    Questdb,
    Mongodb,
    Influxdb,
    Victoriametrics,
    Kx,
}

impl AdapterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AdapterKind::Sqlite => "sqlite",
            AdapterKind::Timescale => "timescale",
            AdapterKind::TdEngine => "tdengine",
            AdapterKind::Clickhouse => "clickhouse",
            AdapterKind::Duckdb => "duckdb",
            AdapterKind::Questdb => "questdb",
            AdapterKind::Mongodb => "mongodb",
            AdapterKind::Influxdb => "influxdb",
            AdapterKind::Victoriametrics => "victoriametrics",
            AdapterKind::Kx => "kx",
        }
    }

    /// Whether this crate carries a real driver for the backend, matching
    /// `get_available_adapters`'s "importable" check.
    pub fn is_available(self) -> bool {
        matches!(self, AdapterKind::Sqlite | AdapterKind::Timescale)
    }

    pub fn available() -> Vec<AdapterKind> {
        [
            AdapterKind::Sqlite,
            AdapterKind::Timescale,
            AdapterKind::TdEngine,
            AdapterKind::Clickhouse,
            AdapterKind::Duckdb,
            AdapterKind::Questdb,
            AdapterKind::Mongodb,
            AdapterKind::Influxdb,
            AdapterKind::Victoriametrics,
            AdapterKind::Kx,
        ]
        .into_iter()
        .filter(|a| a.is_available())
        .collect()
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(AdapterKind::Sqlite),
            "timescale" => Ok(AdapterKind::Timescale),
            "tdengine" => Ok(AdapterKind::TdEngine),
            "clickhouse" => Ok(AdapterKind::Clickhouse),
            "duckdb" => Ok(AdapterKind::Duckdb),
            "questdb" => Ok(AdapterKind::Questdb),
            "mongodb" => Ok(AdapterKind::Mongodb),
            "influxdb" => Ok(AdapterKind::Influxdb),
            "victoriametrics" => Ok(AdapterKind::Victoriametrics),
            "kx" => Ok(AdapterKind::Kx),
            other => Err(StorageError::UnsupportedAdapter(other.to_string())),
        }
    }
}

/// A time-windowed history query (spec.md §4.9 `/history`).
pub struct HistoryQuery<'a> {
    pub table: &'a str,
    pub columns: &'a [String],
    pub from_ts: chrono::DateTime<chrono::Utc>,
    pub to_ts: chrono::DateTime<chrono::Utc>,
    pub limit: Option<u32>,
}

/// A pluggable storage backend for persisted ingester output (spec.md
/// §4.2). Implementors own schema creation, row persistence, and the read
/// paths the query API needs.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    async fn ping(&self) -> bool;

    /// Creates or migrates the table backing `ingester`, idempotently.
    async fn ensure_schema(&self, ingester: &Ingester) -> Result<(), StorageError>;

    /// Persists the current field values of `ingester` as one row.
    async fn insert(&self, ingester: &Ingester) -> Result<(), StorageError>;

    /// Persists many pre-built rows for `table` in one round trip.
    async fn insert_batch(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), StorageError>;

    async fn last(&self, table: &str, columns: &[String]) -> Result<Option<Row>, StorageError>;

    async fn history(&self, query: HistoryQuery<'_>) -> Result<Vec<Row>, StorageError>;

    /// Bulk-loads pre-built rows for back-fill (spec.md §4.2). Rejects
    /// `value` resource ingesters, which are never persisted at all.
    /// `agg_interval` is accepted for adapters that bucket back-filled rows
    /// on insert; the default implementation ignores it and inserts as-is.
    async fn insert_many(
        &self,
        ingester: &Ingester,
        rows: &[Row],
        from_date: chrono::DateTime<chrono::Utc>,
        to_date: chrono::DateTime<chrono::Utc>,
        agg_interval: Option<Interval>,
    ) -> Result<(), StorageError> {
        if ingester.resource_type == ResourceType::Value {
            return Err(StorageError::BackfillRejected(ingester.name.clone()));
        }
        let _ = (from_date, to_date, agg_interval);
        let columns: Vec<String> = ingester.column_fields().into_iter().map(|f| f.name).collect();
        self.insert_batch(&ingester.name, &columns, rows).await
    }

    /// Point read keyed by the `uid` system column (spec.md §4.2, "for
    /// update-type ingesters").
    async fn fetch_by_id(&self, table: &str, uid: &str) -> Result<Option<Row>, StorageError>;

    /// Multi-point read keyed by `uid`, as a single query.
    async fn fetch_batch_by_ids(&self, table: &str, uids: &[String]) -> Result<Vec<Row>, StorageError>;

    /// Cross-table range read; one entry per requested table, aligned on
    /// the same `[from, to]` window (spec.md §4.2).
    async fn fetch_batch(
        &self,
        tables: &[String],
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
        agg_interval: Option<Interval>,
        columns: &[String],
    ) -> Result<BTreeMap<String, Vec<Row>>, StorageError> {
        let _ = agg_interval;
        let mut out = BTreeMap::new();
        for table in tables {
            let rows = self
                .history(HistoryQuery { table, columns, from_ts: from, to_ts: to, limit: None })
                .await?;
            out.insert(table.clone(), rows);
        }
        Ok(out)
    }

    /// Lists every table the adapter currently knows about (spec.md §4.2
    /// introspection).
    async fn list_tables(&self) -> Result<Vec<String>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sqlite_and_timescale_are_available() {
        let available = AdapterKind::available();
        assert!(available.contains(&AdapterKind::Sqlite));
        assert!(available.contains(&AdapterKind::Timescale));
        assert_eq!(available.len(), 2);
    }

    #[test]
    fn unsupported_adapter_reported_not_panicked() {
        let err = "clickhouse".parse::<AdapterKind>();
        assert!(err.is_ok()); // parses fine, just isn't "available"
        assert!(!"clickhouse".parse::<AdapterKind>().unwrap().is_available());
    }

    #[test]
    fn unknown_adapter_name_is_rejected() {
        assert!(matches!(
            "not_a_real_db".parse::<AdapterKind>(),
            Err(StorageError::UnsupportedAdapter(_))
        ));
    }
}
