//! Persistence contract for review items.
//!
//! `upsert` is the only write path and is versioned: a write lands only if
//! the caller read the latest version, so two concurrent reviews of the same
//! item can never silently overwrite each other.

use crate::error::{EngineError, Result};
use crate::models::{ItemId, ItemKey, ReviewItem};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub trait ItemStore: Send + Sync {
    fn get(&self, id: &ItemId) -> Result<ReviewItem>;

    fn find(&self, key: &ItemKey) -> Result<Option<ReviewItem>>;

    /// Inserts an item with `version == 0` or replaces one whose stored
    /// version equals `item.version`. Returns the stored item with its new
    /// version.
    fn upsert(&self, item: &ReviewItem) -> Result<ReviewItem>;

    fn list_items(&self, user_id: &str, roadmap_id: Option<&str>) -> Result<Vec<ReviewItem>>;

    /// Items due at `now`, oldest first.
    fn list_due(
        &self,
        user_id: &str,
        roadmap_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewItem>> {
        let mut due: Vec<_> = self
            .list_items(user_id, roadmap_id)?
            .into_iter()
            .filter(|item| item.is_due(now))
            .collect();
        due.sort_by_key(|item| item.next_review_at);
        Ok(due)
    }
}

fn matches_scope(item: &ReviewItem, user_id: &str, roadmap_id: Option<&str>) -> bool {
    item.key.user_id == user_id && roadmap_id.is_none_or(|r| item.key.roadmap_id == r)
}

/// In-process store, mostly for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: Mutex<HashMap<ItemId, ReviewItem>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ItemStore for MemoryItemStore {
    fn get(&self, id: &ItemId) -> Result<ReviewItem> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    fn find(&self, key: &ItemKey) -> Result<Option<ReviewItem>> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.values().find(|item| &item.key == key).cloned())
    }

    fn upsert(&self, item: &ReviewItem) -> Result<ReviewItem> {
        item.validate()?;
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());

        match items.get(&item.id) {
            Some(stored) if stored.version != item.version => {
                return Err(EngineError::Conflict {
                    id: item.id.clone(),
                    expected: item.version,
                    actual: stored.version,
                });
            }
            Some(_) => {}
            None if item.version != 0 => return Err(EngineError::NotFound(item.id.clone())),
            None => {
                if let Some(existing) = items.values().find(|other| other.key == item.key) {
                    return Err(EngineError::Conflict {
                        id: existing.id.clone(),
                        expected: 0,
                        actual: existing.version,
                    });
                }
            }
        }

        let stored = ReviewItem {
            version: item.version + 1,
            ..item.clone()
        };
        items.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn list_items(&self, user_id: &str, roadmap_id: Option<&str>) -> Result<Vec<ReviewItem>> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let mut scoped: Vec<_> = items
            .values()
            .filter(|item| matches_scope(item, user_id, roadmap_id))
            .cloned()
            .collect();
        scoped.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(scoped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_then_get() {
        let store = MemoryItemStore::new();
        let item = ReviewItem::enroll(ItemKey::new("u1", "rust", "traits"), now());

        let stored = store.upsert(&item).unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(store.get(&item.id).unwrap(), stored);
        assert_eq!(store.find(&item.key).unwrap(), Some(stored));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_item_is_not_found() {
        let store = MemoryItemStore::new();
        let err = store.get(&ItemId::from("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_stale_write_conflicts() {
        let store = MemoryItemStore::new();
        let item = ReviewItem::enroll(ItemKey::new("u1", "rust", "traits"), now());
        let v1 = store.upsert(&item).unwrap();

        // two readers of v1
        let mut first = v1.clone();
        first.repetitions = 1;
        let mut second = v1.clone();
        second.repetitions = 0;

        assert_eq!(store.upsert(&first).unwrap().version, 2);
        let err = store.upsert(&second).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict { expected: 1, actual: 2, .. }
        ));
        assert_eq!(store.get(&item.id).unwrap().repetitions, 1);
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let store = MemoryItemStore::new();
        let key = ItemKey::new("u1", "rust", "traits");
        store.upsert(&ReviewItem::enroll(key.clone(), now())).unwrap();

        let err = store.upsert(&ReviewItem::enroll(key, now())).unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
    }

    #[test]
    fn test_invalid_item_is_not_written() {
        let store = MemoryItemStore::new();
        let mut item = ReviewItem::enroll(ItemKey::new("u1", "rust", "traits"), now());
        item.interval_days = 0;

        assert!(matches!(
            store.upsert(&item),
            Err(EngineError::MalformedItem { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_due_scopes_and_sorts() {
        let store = MemoryItemStore::new();
        let late = ReviewItem::enroll(ItemKey::new("u1", "rust", "a"), now() - Duration::days(2));
        let early = ReviewItem::enroll(ItemKey::new("u1", "rust", "b"), now() - Duration::days(5));
        let future = ReviewItem::enroll(ItemKey::new("u1", "rust", "c"), now() + Duration::days(1));
        let other_roadmap = ReviewItem::enroll(ItemKey::new("u1", "go", "a"), now());
        let other_user = ReviewItem::enroll(ItemKey::new("u2", "rust", "a"), now());
        for item in [&late, &early, &future, &other_roadmap, &other_user] {
            store.upsert(item).unwrap();
        }

        let due = store.list_due("u1", Some("rust"), now()).unwrap();
        let topics: Vec<_> = due.iter().map(|i| i.key.topic_id.as_str()).collect();
        assert_eq!(topics, vec!["b", "a"]);

        assert_eq!(store.list_due("u1", None, now()).unwrap().len(), 3);
        assert_eq!(store.list_items("u1", None).unwrap().len(), 4);
    }
}
