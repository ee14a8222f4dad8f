use crate::data::FieldValue;
use std::collections::BTreeMap;

/// One extracted record: field name to value, inherited fields included
pub type Row = BTreeMap<String, FieldValue>;

/// The unit of fan-out: one URL plus the fields carried over from its source row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkItem {
    /// Absolute URL to fetch
    pub url: String,

    /// Fields inherited from the upstream row (empty for static seeds)
    pub inherited: Row,
}

impl WorkItem {
    /// A work item without inherited fields
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            inherited: Row::new(),
        }
    }

    /// A work item carrying a copy of its source row
    pub fn from_row(url: impl Into<String>, source: &Row) -> Self {
        Self {
            url: url.into(),
            inherited: source.clone(),
        }
    }
}

/// Merges freshly extracted fields over inherited ones
///
/// New fields win on name collision.
pub fn merge_rows(inherited: &Row, extracted: Row) -> Row {
    let mut merged = inherited.clone();
    merged.extend(extracted);
    merged
}

/// Builds a row from `(name, value)` pairs
pub fn row_from<I, K, V>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
