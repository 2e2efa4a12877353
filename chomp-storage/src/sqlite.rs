//! SQLite storage backend, grounded on the generic SQL adapter shape
//! implied by `INTERVAL_TO_SQL` in `src/utils/date.py` and the
//! `Tsdb`/`TsdbAdapter` contract referenced from `main.py` in
//! `examples/original_source`. SQLite is the zero-dependency default used
//! in the worker's test mode.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Row as _, Sqlite, SqlitePool};

use chomp_common::{Field, FieldType, FieldValue, Ingester};

use crate::adapter::{AdapterKind, HistoryQuery, StorageAdapter};
use crate::error::StorageError;
use crate::row::Row;

pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    pub async fn connect(dsn: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new().max_connections(8).connect(dsn).await?;
        Ok(SqliteAdapter { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteAdapter { pool }
    }
}

fn sql_type_for(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Int8
        | FieldType::Int16
        | FieldType::Int32
        | FieldType::Int64
        | FieldType::Uint8
        | FieldType::Uint16
        | FieldType::Uint32
        | FieldType::Uint64 => "INTEGER",
        FieldType::Float32 | FieldType::Float64 => "REAL",
        FieldType::Bool => "INTEGER",
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::String => "TEXT",
        FieldType::Binary | FieldType::Varbinary => "BLOB",
    }
}

fn push_bind_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &FieldValue) {
    match value {
        FieldValue::Null => {
            builder.push_bind(Option::<i64>::None);
        }
        FieldValue::Bool(b) => {
            builder.push_bind(*b as i64);
        }
        FieldValue::Int(i) => {
            builder.push_bind(*i);
        }
        FieldValue::Float(f) => {
            builder.push_bind(*f);
        }
        FieldValue::String(s) => {
            builder.push_bind(s.clone());
        }
        FieldValue::Bytes(b) => {
            builder.push_bind(b.clone());
        }
        FieldValue::Map(m) => {
            let json = serde_json::to_string(m).unwrap_or_default();
            builder.push_bind(json);
        }
    }
}

fn column_value_from_row(row: &sqlx::sqlite::SqliteRow, column: &Field) -> FieldValue {
    use sqlx::ValueRef;
    let raw = row.try_get_raw(column.name.as_str());
    let Ok(raw) = raw else {
        return FieldValue::Null;
    };
    if raw.is_null() {
        return FieldValue::Null;
    }
    match column.field_type {
        FieldType::Int8
        | FieldType::Int16
        | FieldType::Int32
        | FieldType::Int64
        | FieldType::Uint8
        | FieldType::Uint16
        | FieldType::Uint32
        | FieldType::Uint64 => row
            .try_get::<i64, _>(column.name.as_str())
            .map(FieldValue::Int)
            .unwrap_or(FieldValue::Null),
        FieldType::Float32 | FieldType::Float64 => row
            .try_get::<f64, _>(column.name.as_str())
            .map(FieldValue::Float)
            .unwrap_or(FieldValue::Null),
        FieldType::Bool => row
            .try_get::<i64, _>(column.name.as_str())
            .map(|v| FieldValue::Bool(v != 0))
            .unwrap_or(FieldValue::Null),
        FieldType::Timestamp => row
            .try_get::<String, _>(column.name.as_str())
            .map(FieldValue::String)
            .unwrap_or(FieldValue::Null),
        FieldType::String | FieldType::Binary | FieldType::Varbinary => row
            .try_get::<String, _>(column.name.as_str())
            .map(FieldValue::String)
            .unwrap_or(FieldValue::Null),
    }
}

#[async_trait]
impl StorageAdapter for SqliteAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Sqlite
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn ensure_schema(&self, ingester: &Ingester) -> Result<(), StorageError> {
        let columns = ingester.column_fields();
        let mut sql = format!("CREATE TABLE IF NOT EXISTS \"{}\" (", ingester.name);
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                sql.push(',');
            }
            sql.push_str(&format!("\"{}\" {}", col.name, sql_type_for(col.field_type)));
        }
        sql.push(')');
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, ingester: &Ingester) -> Result<(), StorageError> {
        let columns = ingester.column_fields();
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO \"{}\" (", ingester.name));
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(format!("\"{}\"", col.name));
        }
        builder.push(") VALUES (");
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            let value = if col.name == "ts" {
                FieldValue::String(Utc::now().to_rfc3339())
            } else {
                ingester
                    .field_by_name(&col.name)
                    .map(|f| f.value.clone())
                    .unwrap_or(FieldValue::Null)
            };
            push_bind_value(&mut builder, &value);
        }
        builder.push(")");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_batch(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), StorageError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!("INSERT INTO \"{table}\" ("));
            for (i, name) in columns.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                builder.push(format!("\"{name}\""));
            }
            builder.push(") VALUES (");
            for (i, name) in columns.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                let value = row.get(name).cloned().unwrap_or(FieldValue::Null);
                push_bind_value(&mut builder, &value);
            }
            builder.push(")");
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn last(&self, table: &str, columns: &[String]) -> Result<Option<Row>, StorageError> {
        let col_list = columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {col_list} FROM \"{table}\" ORDER BY ts DESC LIMIT 1");
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| sqlite_row_to_generic(&r, columns)))
    }

    async fn history(&self, query: HistoryQuery<'_>) -> Result<Vec<Row>, StorageError> {
        let col_list = query
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "SELECT {col_list} FROM \"{}\" WHERE ts >= ? AND ts <= ? ORDER BY ts ASC",
            query.table
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let rows = sqlx::query(&sql)
            .bind(query.from_ts.to_rfc3339())
            .bind(query.to_ts.to_rfc3339())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| sqlite_row_to_generic(r, query.columns)).collect())
    }

    async fn fetch_by_id(&self, table: &str, uid: &str) -> Result<Option<Row>, StorageError> {
        let sql = format!("SELECT * FROM \"{table}\" WHERE \"uid\" = ? LIMIT 1");
        let row = sqlx::query(&sql).bind(uid).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| sqlite_row_to_all_columns(&r)))
    }

    async fn fetch_batch_by_ids(&self, table: &str, uids: &[String]) -> Result<Vec<Row>, StorageError> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT * FROM \"{table}\" WHERE \"uid\" IN ("));
        let mut separated = builder.separated(", ");
        for uid in uids {
            separated.push_bind(uid.clone());
        }
        builder.push(")");
        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(sqlite_row_to_all_columns).collect())
    }

    async fn list_tables(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>("name")).collect())
    }
}

/// Reads every column the driver reports for a row, without needing the
/// caller's declared column list (used by the `uid`-keyed point reads,
/// where the table's full shape is wanted back).
fn sqlite_row_to_all_columns(row: &sqlx::sqlite::SqliteRow) -> Row {
    use sqlx::{Column, TypeInfo, ValueRef};
    let mut out = Row::new();
    for column in row.columns() {
        let name = column.name();
        let raw = row.try_get_raw(name);
        let value = match raw {
            Ok(raw) if !raw.is_null() => match column.type_info().name() {
                "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(name).map(FieldValue::Int).unwrap_or(FieldValue::Null),
                "REAL" => row.try_get::<f64, _>(name).map(FieldValue::Float).unwrap_or(FieldValue::Null),
                _ => row.try_get::<String, _>(name).map(FieldValue::String).unwrap_or(FieldValue::Null),
            },
            _ => FieldValue::Null,
        };
        out.insert(name.to_string(), value);
    }
    out
}

fn sqlite_row_to_generic(row: &sqlx::sqlite::SqliteRow, columns: &[String]) -> Row {
    let mut out = Row::new();
    for name in columns {
        let value = row
            .try_get::<String, _>(name.as_str())
            .map(FieldValue::String)
            .or_else(|_| row.try_get::<i64, _>(name.as_str()).map(FieldValue::Int))
            .or_else(|_| row.try_get::<f64, _>(name.as_str()).map(FieldValue::Float))
            .unwrap_or(FieldValue::Null);
        out.insert(name.clone(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chomp_common::{IngesterType, ResourceType};

    async fn memory_adapter() -> SqliteAdapter {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteAdapter::from_pool(pool)
    }

    fn sample_ingester() -> Ingester {
        let mut ing = Ingester::new(
            "btc_price",
            IngesterType::HttpApi,
            ResourceType::Timeseries,
            "m1".parse().unwrap(),
        );
        let mut f = Field::new("usd", FieldType::Float64, "http://x", ".data.usd");
        f.value = FieldValue::Float(64000.5);
        ing.fields.push(f);
        ing
    }

    #[tokio::test]
    async fn ensure_schema_then_insert_then_last_round_trips() {
        let adapter = memory_adapter().await;
        let ing = sample_ingester();
        adapter.ensure_schema(&ing).await.unwrap();
        adapter.insert(&ing).await.unwrap();
        let columns = vec!["ts".to_string(), "usd".to_string()];
        let last = adapter.last(&ing.name, &columns).await.unwrap();
        assert!(last.is_some());
    }

    #[tokio::test]
    async fn ping_succeeds_against_live_pool() {
        let adapter = memory_adapter().await;
        assert!(adapter.ping().await);
    }

    fn sample_update_ingester() -> Ingester {
        let mut ing = Ingester::new(
            "wallet",
            IngesterType::HttpApi,
            ResourceType::Update,
            "m1".parse().unwrap(),
        );
        let mut f = Field::new("balance", FieldType::Float64, "http://x", ".data.balance");
        f.value = FieldValue::Float(12.5);
        ing.fields.push(f);
        ing
    }

    #[tokio::test]
    async fn fetch_by_id_finds_a_row_by_uid() {
        let adapter = memory_adapter().await;
        let ing = sample_update_ingester();
        adapter.ensure_schema(&ing).await.unwrap();
        let mut row = Row::new();
        row.insert("uid".to_string(), FieldValue::String("abc".to_string()));
        row.insert("balance".to_string(), FieldValue::Float(12.5));
        adapter
            .insert_batch(&ing.name, &["uid".to_string(), "balance".to_string()], &[row])
            .await
            .unwrap();

        let found = adapter.fetch_by_id(&ing.name, "abc").await.unwrap();
        assert!(found.is_some());
        assert!(adapter.fetch_by_id(&ing.name, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_batch_by_ids_returns_every_match_in_one_query() {
        let adapter = memory_adapter().await;
        let ing = sample_update_ingester();
        adapter.ensure_schema(&ing).await.unwrap();
        for uid in ["a", "b", "c"] {
            let mut row = Row::new();
            row.insert("uid".to_string(), FieldValue::String(uid.to_string()));
            row.insert("balance".to_string(), FieldValue::Float(1.0));
            adapter
                .insert_batch(&ing.name, &["uid".to_string(), "balance".to_string()], &[row])
                .await
                .unwrap();
        }
        let rows = adapter
            .fetch_batch_by_ids(&ing.name, &["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn list_tables_reports_created_tables_only() {
        let adapter = memory_adapter().await;
        let ing = sample_ingester();
        adapter.ensure_schema(&ing).await.unwrap();
        let tables = adapter.list_tables().await.unwrap();
        assert!(tables.contains(&"btc_price".to_string()));
        assert!(tables.iter().all(|t| !t.starts_with("sqlite_")));
    }

    #[tokio::test]
    async fn insert_many_rejects_value_resource_ingesters() {
        let adapter = memory_adapter().await;
        let mut ing = sample_ingester();
        ing.resource_type = ResourceType::Value;
        let now = ing.started.unwrap_or_else(chrono::Utc::now);
        let err = adapter.insert_many(&ing, &[], now, now, None).await.unwrap_err();
        assert!(matches!(err, StorageError::BackfillRejected(_)));
    }
}
