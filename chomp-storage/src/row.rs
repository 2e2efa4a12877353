use std::collections::BTreeMap;

use chomp_common::FieldValue;

/// One persisted record: column name to value, in the order an adapter
/// chooses to return them. Shared across all `StorageAdapter` implementors
/// so the query API never needs to know which backend produced a row.
pub type Row = BTreeMap<String, FieldValue>;
