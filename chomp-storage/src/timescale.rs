//! TimescaleDB storage backend: a Postgres pool plus a `create_hypertable`
//! call on first schema creation. Grounded the same way as
//! [`crate::sqlite::SqliteAdapter`] on the `Tsdb` contract implied by
//! `main.py`/`src/utils/date.py` in `examples/original_source`; the
//! hypertable step is Timescale-specific and has no Python-side
//! counterpart since the original never shipped a real Timescale client.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row as _};

use chomp_common::{FieldType, FieldValue, Ingester};

use crate::adapter::{AdapterKind, HistoryQuery, StorageAdapter};
use crate::error::StorageError;
use crate::row::Row;

pub struct TimescaleAdapter {
    pool: PgPool,
}

impl TimescaleAdapter {
    pub async fn connect(dsn: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new().max_connections(8).connect(dsn).await?;
        Ok(TimescaleAdapter { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        TimescaleAdapter { pool }
    }
}

fn sql_type_for(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Int8 | FieldType::Int16 | FieldType::Uint8 | FieldType::Uint16 => "SMALLINT",
        FieldType::Int32 | FieldType::Uint32 => "INTEGER",
        FieldType::Int64 | FieldType::Uint64 => "BIGINT",
        FieldType::Float32 => "REAL",
        FieldType::Float64 => "DOUBLE PRECISION",
        FieldType::Bool => "BOOLEAN",
        FieldType::Timestamp => "TIMESTAMPTZ",
        FieldType::String => "TEXT",
        FieldType::Binary | FieldType::Varbinary => "BYTEA",
    }
}

fn push_bind_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Null => {
            builder.push_bind(Option::<i64>::None);
        }
        FieldValue::Bool(b) => {
            builder.push_bind(*b);
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

#[async_trait]
impl StorageAdapter for TimescaleAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Timescale
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

        if ingester.resource_type.is_persisted() && columns.iter().any(|c| c.name == "ts") {
            let hypertable_sql = format!(
                "SELECT create_hypertable('\"{}\"', 'ts', if_not_exists => TRUE)",
                ingester.name
            );
            // Ignore failures here: the extension may be absent on a plain
            // Postgres instance used for local development.
            let _ = sqlx::query(&hypertable_sql).execute(&self.pool).await;
        }
        Ok(())
    }

    async fn insert(&self, ingester: &Ingester) -> Result<(), StorageError> {
        let columns = ingester.column_fields();
        let mut builder: QueryBuilder<Postgres> =
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
                FieldValue::String(chrono::Utc::now().to_rfc3339())
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
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("INSERT INTO \"{table}\" ("));
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
        Ok(row.map(|r| pg_row_to_generic(&r, columns)))
    }

    async fn history(&self, query: HistoryQuery<'_>) -> Result<Vec<Row>, StorageError> {
        let col_list = query
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "SELECT {col_list} FROM \"{}\" WHERE ts >= $1 AND ts <= $2 ORDER BY ts ASC",
            query.table
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let rows = sqlx::query(&sql)
            .bind(query.from_ts)
            .bind(query.to_ts)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| pg_row_to_generic(r, query.columns)).collect())
    }

    async fn fetch_by_id(&self, table: &str, uid: &str) -> Result<Option<Row>, StorageError> {
        let sql = format!("SELECT * FROM \"{table}\" WHERE \"uid\" = $1 LIMIT 1");
        let row = sqlx::query(&sql).bind(uid).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| pg_row_to_all_columns(&r)))
    }

    async fn fetch_batch_by_ids(&self, table: &str, uids: &[String]) -> Result<Vec<Row>, StorageError> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT * FROM \"{table}\" WHERE \"uid\" IN ("));
        let mut separated = builder.separated(", ");
        for uid in uids {
            separated.push_bind(uid.clone());
        }
        builder.push(")");
        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(pg_row_to_all_columns).collect())
    }

    async fn list_tables(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>("table_name")).collect())
    }
}

/// Reads every column the driver reports for a row (used by the
/// `uid`-keyed point reads, where the table's full shape is wanted back).
fn pg_row_to_all_columns(row: &sqlx::postgres::PgRow) -> Row {
    use sqlx::{Column, ValueRef};
    let mut out = Row::new();
    for column in row.columns() {
        let name = column.name();
        let raw = row.try_get_raw(name);
        let value = match raw {
            Ok(raw) if !raw.is_null() => row
                .try_get::<String, _>(name)
                .map(FieldValue::String)
                .or_else(|_| row.try_get::<i64, _>(name).map(FieldValue::Int))
                .or_else(|_| row.try_get::<f64, _>(name).map(FieldValue::Float))
                .or_else(|_| row.try_get::<bool, _>(name).map(FieldValue::Bool))
                .unwrap_or(FieldValue::Null),
            _ => FieldValue::Null,
        };
        out.insert(name.to_string(), value);
    }
    out
}

fn pg_row_to_generic(row: &sqlx::postgres::PgRow, columns: &[String]) -> Row {
    let mut out = Row::new();
    for name in columns {
        let value = row
            .try_get::<String, _>(name.as_str())
            .map(FieldValue::String)
            .or_else(|_| row.try_get::<i64, _>(name.as_str()).map(FieldValue::Int))
            .or_else(|_| row.try_get::<f64, _>(name.as_str()).map(FieldValue::Float))
            .or_else(|_| row.try_get::<bool, _>(name.as_str()).map(FieldValue::Bool))
            .unwrap_or(FieldValue::Null);
        out.insert(name.clone(), value);
    }
    out
}
