use crate::data::Row;
use std::collections::{BTreeMap, HashMap};

/// Per-entity result storage for one run
///
/// Each entity is written once, after its fan-out completes. Entities are
/// processed sequentially, so the store is never written concurrently.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    entities: HashMap<String, Vec<Row>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the rows of an entity
    ///
    /// Returns `false` and keeps the existing rows if the entity was already
    /// stored.
    pub fn insert(&mut self, entity: &str, rows: Vec<Row>) -> bool {
        if self.entities.contains_key(entity) {
            tracing::warn!("Entity '{}' was already stored, keeping first result", entity);
            return false;
        }
        self.entities.insert(entity.to_string(), rows);
        true
    }

    /// Rows of an entity, `None` if the entity has not been stored
    pub fn get(&self, entity: &str) -> Option<&[Row]> {
        self.entities.get(entity).map(Vec::as_slice)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// Row count per stored entity, sorted by entity name
    pub fn row_counts(&self) -> BTreeMap<String, usize> {
        self.entities
            .iter()
            .map(|(name, rows)| (name.clone(), rows.len()))
            .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }
}
