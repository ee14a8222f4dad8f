//! Run aggregation
//!
//! Picks the final dataset (the rows of the last declared entity) and
//! deduplicates it on the configured primary key.

use crate::config::JobSpec;
use crate::data::{DataStore, Row};
use std::collections::HashSet;

/// The deduplicated rows of the final entity
#[derive(Debug, Clone, Default)]
pub struct FinalTable {
    pub entity: String,
    pub rows: Vec<Row>,
    pub duplicates_removed: usize,
}

/// Primary-key columns present in at least one row
pub fn key_columns<'a>(rows: &[Row], primary_key: &'a [String]) -> Vec<&'a str> {
    primary_key
        .iter()
        .filter(|column| rows.iter().any(|row| row.contains_key(column.as_str())))
        .map(String::as_str)
        .collect()
}

/// Removes rows whose key tuple was already seen, keeping first occurrences
///
/// Only primary-key columns that exist in the table take part in the key.
/// Without any such column the table is returned unchanged.
pub fn deduplicate(rows: Vec<Row>, primary_key: &[String]) -> Vec<Row> {
    let columns = key_columns(&rows, primary_key);
    if columns.is_empty() {
        if !primary_key.is_empty() {
            tracing::warn!(
                "None of the primary key columns {:?} exist, skipping deduplication",
                primary_key
            );
        }
        return rows;
    }

    let mut seen: HashSet<Vec<Option<String>>> = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let key = columns
                .iter()
                .map(|column| row.get(*column).and_then(|v| v.key_repr()))
                .collect();
            seen.insert(key)
        })
        .collect()
}

/// Builds the final table from the stored entity rows
pub fn finalize(store: &DataStore, job: &JobSpec) -> FinalTable {
    let entity = match job.final_entity() {
        Some(entity) => entity.name.clone(),
        None => return FinalTable::default(),
    };

    let rows = store.get(&entity).map(<[Row]>::to_vec).unwrap_or_default();
    let before = rows.len();
    let rows = deduplicate(rows, &job.output.primary_key);
    let duplicates_removed = before - rows.len();

    if duplicates_removed > 0 {
        tracing::info!(
            "Removed {} duplicate rows from {} on {:?}",
            duplicates_removed,
            entity,
            job.output.primary_key
        );
    }

    FinalTable {
        entity,
        rows,
        duplicates_removed,
    }
}
