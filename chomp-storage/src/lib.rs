pub mod adapter;
pub mod error;
pub mod row;
pub mod sqlite;
pub mod timescale;

pub use adapter::{AdapterKind, HistoryQuery, StorageAdapter};
pub use error::StorageError;
pub use row::Row;
pub use sqlite::SqliteAdapter;
pub use timescale::TimescaleAdapter;

/// Constructs an adapter by name for `kind`s this crate carries a driver
/// for; everything else in [`AdapterKind`] exists for completeness with the
/// original's adapter registry but returns
/// [`StorageError::UnsupportedAdapter`] here (spec.md §4.2's scoped-down
/// backend list).
pub async fn connect(kind: AdapterKind, dsn: &str) -> Result<Box<dyn StorageAdapter>, StorageError> {
    match kind {
        AdapterKind::Sqlite => Ok(Box::new(SqliteAdapter::connect(dsn).await?)),
        AdapterKind::Timescale => Ok(Box::new(TimescaleAdapter::connect(dsn).await?)),
        other => Err(StorageError::UnsupportedAdapter(other.to_string())),
    }
}
