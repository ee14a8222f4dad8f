//! Work item resolution
//!
//! Turns an entity into the work items to fetch, either from its static
//! seed URL or by projecting an earlier entity's stored rows through one of
//! their fields.

use crate::config::{split_follow_from, EntitySpec};
use crate::data::{DataStore, FieldValue, WorkItem};
use crate::url::resolve_url;
use url::Url;

/// Computes the work items of `entity`
///
/// Never fails: an unresolvable seed, a malformed `follow-from` or a missing
/// source entity are logged and produce no work items.
///
/// # Arguments
///
/// * `entity` - The entity to resolve
/// * `store` - Rows of the entities processed so far
/// * `base_url` - Site base URL relative links are resolved against
pub fn resolve(entity: &EntitySpec, store: &DataStore, base_url: &Url) -> Vec<WorkItem> {
    if let Some(url) = &entity.url {
        return match resolve_url(base_url, url) {
            Some(absolute) => vec![WorkItem::seed(absolute)],
            None => {
                tracing::error!("[{}] Cannot resolve seed URL '{}'", entity.name, url);
                Vec::new()
            }
        };
    }

    let reference = match &entity.follow_from {
        Some(reference) => reference,
        None => {
            tracing::warn!("[{}] Entity has neither url nor follow-from", entity.name);
            return Vec::new();
        }
    };

    let (source_entity, source_field) = match split_follow_from(reference) {
        Some(parts) => parts,
        None => {
            tracing::error!(
                "[{}] Invalid follow-from '{}', expected 'Entity.field'",
                entity.name,
                reference
            );
            return Vec::new();
        }
    };

    let rows = match store.get(source_entity) {
        Some(rows) => rows,
        None => {
            tracing::warn!(
                "[{}] Source entity '{}' not found or has no data",
                entity.name,
                source_entity
            );
            return Vec::new();
        }
    };

    let mut items = Vec::new();
    for row in rows {
        let links: Vec<String> = match row.get(source_field) {
            None => continue,
            Some(value) if value.is_blank() => continue,
            Some(FieldValue::List(values)) => values.clone(),
            Some(value) => vec![value.to_string()],
        };

        for link in links.iter().filter(|l| !l.trim().is_empty()) {
            match resolve_url(base_url, link) {
                Some(absolute) => items.push(WorkItem::from_row(absolute, row)),
                None => tracing::debug!(
                    "[{}] Skipping unfollowable link '{}'",
                    entity.name,
                    link
                ),
            }
        }
    }

    tracing::debug!(
        "[{}] Resolved {} work items from {}",
        entity.name,
        items.len(),
        reference
    );
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{row_from, Row};

    fn base() -> Url {
        Url::parse("https://shop.example.com/").unwrap()
    }

    #[test]
    fn test_static_seed() {
        let entity = EntitySpec::with_url("List", "/products", ".item");
        let items = resolve(&entity, &DataStore::new(), &base());

        assert_eq!(
            items,
            vec![WorkItem::seed("https://shop.example.com/products")]
        );
        assert!(items[0].inherited.is_empty());
    }

    #[test]
    fn test_follow_from_skips_empty_values() {
        let mut store = DataStore::new();
        let mut null_row = Row::new();
        null_row.insert("f".to_string(), FieldValue::Null);
        let mut empty_list = Row::new();
        empty_list.insert("f".to_string(), FieldValue::List(Vec::new()));
        store.insert(
            "A",
            vec![
                row_from([("f", "x"), ("name", "one")]),
                null_row,
                row_from([("f", "")]),
                row_from([("f", "   ")]),
                empty_list,
                row_from([("f", "y"), ("name", "two")]),
            ],
        );

        let entity = EntitySpec::following("B", "A.f", ".detail");
        let items = resolve(&entity, &store, &base());

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://shop.example.com/x");
        assert_eq!(items[0].inherited["name"], FieldValue::text("one"));
        assert_eq!(items[1].url, "https://shop.example.com/y");
        assert_eq!(items[1].inherited["name"], FieldValue::text("two"));
    }

    #[test]
    fn test_list_values_fan_out() {
        let mut store = DataStore::new();
        let mut row = Row::new();
        row.insert(
            "links".to_string(),
            FieldValue::List(vec!["/a".to_string(), "/b".to_string()]),
        );
        store.insert("A", vec![row]);

        let entity = EntitySpec::following("B", "A.links", ".detail");
        let items = resolve(&entity, &store, &base());

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].url, "https://shop.example.com/b");
    }

    #[test]
    fn test_missing_source_entity_yields_nothing() {
        let entity = EntitySpec::following("B", "A.f", ".detail");
        assert!(resolve(&entity, &DataStore::new(), &base()).is_empty());
    }

    #[test]
    fn test_malformed_follow_from_yields_nothing() {
        let mut store = DataStore::new();
        store.insert("A", vec![row_from([("f", "x")])]);

        for reference in ["A", "A.f.g", ".f", "A."] {
            let entity = EntitySpec::following("B", reference, ".detail");
            assert!(resolve(&entity, &store, &base()).is_empty(), "{}", reference);
        }
    }
}
