//! SQLite-backed review item store.
//!
//! Handles schema creation, versioned writes of scheduling state, due-item
//! queries, and the optional simulated "current date" used to replay
//! spaced repetition from the command line.

use crate::error::{EngineError, Result};
use crate::models::{ItemId, ItemKey, RawReviewItem, ReviewItem};
use crate::store::ItemStore;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SELECT_COLUMNS: &str = "id, user_id, roadmap_id, topic_id, question_id, easiness_factor,
     interval_days, repetitions, next_review_at, last_review_at, last_quality,
     review_count, version";

pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// Opens (or creates) the database file and its tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened review database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulated date, if one has been set.
    pub fn simulated_now(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock();
        let millis: Option<i64> = conn
            .query_row(
                "SELECT value FROM app_state WHERE key = 'current_date'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .and_then(|value| value.parse().ok());
        Ok(millis.and_then(DateTime::from_timestamp_millis))
    }

    pub fn set_simulated_now(&self, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO app_state (key, value) VALUES ('current_date', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![at.timestamp_millis().to_string()],
        )?;
        Ok(())
    }

    pub fn clear_simulated_now(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM app_state WHERE key = 'current_date'", [])?;
        Ok(())
    }

    fn query_rows<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<RawReviewItem>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, raw_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Lookup by id or key: a malformed row is an error.
    fn query_one<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Option<ReviewItem>> {
        self.query_rows(sql, params)?
            .pop()
            .map(validate_row)
            .transpose()
    }

    /// Listings skip malformed rows so one bad record does not hide the rest.
    fn query_many<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<ReviewItem>> {
        Ok(self
            .query_rows(sql, params)?
            .into_iter()
            .filter_map(|raw| validate_row(raw).ok())
            .collect())
    }
}

/// Creates the review item and app state tables.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS review_items (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            roadmap_id TEXT NOT NULL,
            topic_id TEXT NOT NULL,
            question_id TEXT NOT NULL DEFAULT '',
            easiness_factor REAL NOT NULL DEFAULT 2.5,
            interval_days INTEGER NOT NULL DEFAULT 1,
            repetitions INTEGER NOT NULL DEFAULT 0,
            next_review_at INTEGER NOT NULL,
            last_review_at INTEGER,
            last_quality INTEGER,
            review_count INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1,
            UNIQUE(user_id, roadmap_id, topic_id, question_id)
        );
        CREATE INDEX IF NOT EXISTS idx_review_items_due
            ON review_items (user_id, next_review_at);
        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn raw_from_row(row: &Row<'_>) -> rusqlite::Result<RawReviewItem> {
    let question_id: String = row.get(4)?;
    let millis = |idx: usize| -> rusqlite::Result<Option<DateTime<Utc>>> {
        Ok(row
            .get::<_, Option<i64>>(idx)?
            .and_then(DateTime::from_timestamp_millis))
    };

    Ok(RawReviewItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        roadmap_id: row.get(2)?,
        topic_id: row.get(3)?,
        question_id: (!question_id.is_empty()).then_some(question_id),
        easiness_factor: row.get(5)?,
        interval_days: row.get(6)?,
        repetitions: row.get(7)?,
        next_review_at: millis(8)?,
        last_review_at: millis(9)?,
        last_quality: row.get(10)?,
        review_count: row.get(11)?,
        version: row.get(12)?,
    })
}

fn validate_row(raw: RawReviewItem) -> Result<ReviewItem> {
    ReviewItem::try_from(raw).inspect_err(|err| {
        tracing::warn!(error = %err, "rejected malformed review item row");
    })
}

fn question_column(key: &ItemKey) -> &str {
    key.question_id.as_deref().unwrap_or("")
}

impl ItemStore for SqliteItemStore {
    fn get(&self, id: &ItemId) -> Result<ReviewItem> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM review_items WHERE id = ?1");
        self.query_one(&sql, params![id.as_str()])?
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    fn find(&self, key: &ItemKey) -> Result<Option<ReviewItem>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM review_items
             WHERE user_id = ?1 AND roadmap_id = ?2 AND topic_id = ?3 AND question_id = ?4"
        );
        self.query_one(
            &sql,
            params![key.user_id, key.roadmap_id, key.topic_id, question_column(key)],
        )
    }

    fn upsert(&self, item: &ReviewItem) -> Result<ReviewItem> {
        item.validate()?;
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored_version: Option<i64> = tx
            .query_row(
                "SELECT version FROM review_items WHERE id = ?1",
                params![item.id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let next_version = item.version + 1;
        match stored_version {
            None if item.version != 0 => return Err(EngineError::NotFound(item.id.clone())),
            None => {
                let existing: Option<(String, i64)> = tx
                    .query_row(
                        "SELECT id, version FROM review_items
                         WHERE user_id = ?1 AND roadmap_id = ?2 AND topic_id = ?3 AND question_id = ?4",
                        params![
                            item.key.user_id,
                            item.key.roadmap_id,
                            item.key.topic_id,
                            question_column(&item.key)
                        ],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                if let Some((id, version)) = existing {
                    return Err(EngineError::Conflict {
                        id: ItemId(id),
                        expected: 0,
                        actual: version as u64,
                    });
                }

                tx.execute(
                    "INSERT INTO review_items (id, user_id, roadmap_id, topic_id, question_id,
                        easiness_factor, interval_days, repetitions, next_review_at,
                        last_review_at, last_quality, review_count, version)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        item.id.as_str(),
                        item.key.user_id,
                        item.key.roadmap_id,
                        item.key.topic_id,
                        question_column(&item.key),
                        item.easiness_factor,
                        item.interval_days,
                        item.repetitions,
                        item.next_review_at.timestamp_millis(),
                        item.last_review_at.map(|at| at.timestamp_millis()),
                        item.last_quality.map(|q| q.value()),
                        item.review_count,
                        next_version as i64,
                    ],
                )?;
            }
            Some(actual) if actual as u64 != item.version => {
                tracing::warn!(
                    item_id = %item.id,
                    expected = item.version,
                    actual,
                    "stale review item write rejected"
                );
                return Err(EngineError::Conflict {
                    id: item.id.clone(),
                    expected: item.version,
                    actual: actual as u64,
                });
            }
            Some(_) => {
                tx.execute(
                    "UPDATE review_items
                     SET easiness_factor = ?1, interval_days = ?2, repetitions = ?3,
                         next_review_at = ?4, last_review_at = ?5, last_quality = ?6,
                         review_count = ?7, version = ?8
                     WHERE id = ?9 AND version = ?10",
                    params![
                        item.easiness_factor,
                        item.interval_days,
                        item.repetitions,
                        item.next_review_at.timestamp_millis(),
                        item.last_review_at.map(|at| at.timestamp_millis()),
                        item.last_quality.map(|q| q.value()),
                        item.review_count,
                        next_version as i64,
                        item.id.as_str(),
                        item.version as i64,
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(ReviewItem {
            version: next_version,
            ..item.clone()
        })
    }

    fn list_items(&self, user_id: &str, roadmap_id: Option<&str>) -> Result<Vec<ReviewItem>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM review_items
             WHERE user_id = ?1 AND (?2 IS NULL OR roadmap_id = ?2)
             ORDER BY id"
        );
        self.query_many(&sql, params![user_id, roadmap_id])
    }

    fn list_due(
        &self,
        user_id: &str,
        roadmap_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewItem>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM review_items
             WHERE user_id = ?1 AND (?2 IS NULL OR roadmap_id = ?2) AND next_review_at <= ?3
             ORDER BY next_review_at ASC"
        );
        self.query_many(&sql, params![user_id, roadmap_id, now.timestamp_millis()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quality;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, 18, 30, 0).unwrap()
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let mut item = ReviewItem::enroll(
            ItemKey::new("u1", "rust", "borrowing").with_question("q3"),
            now(),
        );
        item.last_quality = Some(Quality::new(2));
        item.last_review_at = Some(now() - Duration::days(1));

        let stored = store.upsert(&item).unwrap();
        assert_eq!(stored.version, 1);

        let loaded = store.get(&item.id).unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(store.find(&item.key).unwrap(), Some(stored));
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let err = store.get(&ItemId::from("missing")).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_versioned_update() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let item = ReviewItem::enroll(ItemKey::new("u1", "rust", "borrowing"), now());
        let v1 = store.upsert(&item).unwrap();

        let mut next = v1.clone();
        next.repetitions = 1;
        next.last_quality = Some(Quality::new(5));
        let v2 = store.upsert(&next).unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(store.get(&item.id).unwrap().repetitions, 1);

        // a writer still holding v1 loses
        let err = store.upsert(&v1).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict { expected: 1, actual: 2, .. }
        ));
    }

    #[test]
    fn test_same_key_twice_conflicts() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let key = ItemKey::new("u1", "rust", "borrowing");
        store.upsert(&ReviewItem::enroll(key.clone(), now())).unwrap();

        let err = store.upsert(&ReviewItem::enroll(key, now())).unwrap_err();
        assert!(matches!(err, EngineError::Conflict { expected: 0, .. }));
    }

    #[test]
    fn test_list_due_orders_by_next_review() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let items = [
            ReviewItem::enroll(ItemKey::new("u1", "rust", "a"), now() - Duration::hours(3)),
            ReviewItem::enroll(ItemKey::new("u1", "rust", "b"), now() - Duration::days(2)),
            ReviewItem::enroll(ItemKey::new("u1", "rust", "c"), now() + Duration::hours(3)),
            ReviewItem::enroll(ItemKey::new("u1", "go", "d"), now() - Duration::days(9)),
        ];
        for item in &items {
            store.upsert(item).unwrap();
        }

        let due = store.list_due("u1", Some("rust"), now()).unwrap();
        let topics: Vec<_> = due.iter().map(|i| i.key.topic_id.as_str()).collect();
        assert_eq!(topics, vec!["b", "a"]);

        let all_due = store.list_due("u1", None, now()).unwrap();
        assert_eq!(all_due[0].key.topic_id, "d");
        assert_eq!(store.list_items("u1", None).unwrap().len(), 4);
        assert!(store.list_items("u2", None).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_row_is_rejected() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        store
            .lock()
            .execute(
                "INSERT INTO review_items (id, user_id, roadmap_id, topic_id,
                    easiness_factor, interval_days, next_review_at)
                 VALUES ('bad', 'u1', 'rust', 'a', 0.9, 1, 0)",
                [],
            )
            .unwrap();

        let err = store.get(&ItemId::from("bad")).unwrap_err();
        assert!(matches!(err, EngineError::MalformedItem { .. }));
    }

    #[test]
    fn test_listings_skip_malformed_rows() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let good = ReviewItem::enroll(ItemKey::new("u1", "rust", "b"), now() - Duration::days(1));
        store.upsert(&good).unwrap();
        store
            .lock()
            .execute(
                "INSERT INTO review_items (id, user_id, roadmap_id, topic_id,
                    easiness_factor, interval_days, next_review_at)
                 VALUES ('bad', 'u1', 'rust', 'a', 0.9, 1, 0)",
                [],
            )
            .unwrap();

        let listed = store.list_items("u1", Some("rust")).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, good.id);

        let due = store.list_due("u1", None, now()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, good.id);

        assert!(store.find(&ItemKey::new("u1", "rust", "a")).is_err());
    }

    #[test]
    fn test_simulated_date() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        assert_eq!(store.simulated_now().unwrap(), None);

        store.set_simulated_now(now()).unwrap();
        store.set_simulated_now(now() + Duration::days(1)).unwrap();
        assert_eq!(store.simulated_now().unwrap(), Some(now() + Duration::days(1)));

        store.clear_simulated_now().unwrap();
        assert_eq!(store.simulated_now().unwrap(), None);
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learning.sqlite3");
        let item = ReviewItem::enroll(ItemKey::new("u1", "rust", "borrowing"), now());

        {
            let store = SqliteItemStore::open(&path).unwrap();
            store.upsert(&item).unwrap();
        }

        let store = SqliteItemStore::open(&path).unwrap();
        assert_eq!(store.get(&item.id).unwrap().version, 1);
    }
}
