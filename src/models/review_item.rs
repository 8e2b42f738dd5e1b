//! Scheduling state of one learner/topic pairing.
//!
//! A `ReviewItem` is created on enrollment and afterwards only ever
//! advanced by the scheduler. Records coming back from a store go through
//! [`RawReviewItem`] and are validated before any math sees them.

use super::Quality;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;
pub const MIN_EASINESS_FACTOR: f64 = 1.3;
pub const MIN_INTERVAL_DAYS: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is learning what. Unique per store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub user_id: String,
    pub roadmap_id: String,
    pub topic_id: String,
    pub question_id: Option<String>,
}

impl ItemKey {
    pub fn new(user_id: &str, roadmap_id: &str, topic_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            roadmap_id: roadmap_id.to_string(),
            topic_id: topic_id.to_string(),
            question_id: None,
        }
    }

    pub fn with_question(mut self, question_id: &str) -> Self {
        self.question_id = Some(question_id.to_string());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReviewItem")]
pub struct ReviewItem {
    pub id: ItemId,
    #[serde(flatten)]
    pub key: ItemKey,
    pub easiness_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub next_review_at: DateTime<Utc>,
    pub last_review_at: Option<DateTime<Utc>>,
    pub last_quality: Option<Quality>,
    /// Total answers applied, including lapses.
    pub review_count: u32,
    /// Optimistic concurrency token; 0 means never persisted.
    pub version: u64,
}

impl ReviewItem {
    /// Fresh item, due immediately.
    pub fn enroll(key: ItemKey, now: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::generate(),
            key,
            easiness_factor: DEFAULT_EASINESS_FACTOR,
            interval_days: MIN_INTERVAL_DAYS,
            repetitions: 0,
            next_review_at: now,
            last_review_at: None,
            last_quality: None,
            review_count: 0,
            version: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }

    pub fn was_reviewed(&self) -> bool {
        self.last_review_at.is_some() || self.last_quality.is_some()
    }

    /// Checks the numeric invariants of the scheduling state.
    pub fn validate(&self) -> Result<(), EngineError> {
        let ef = self.easiness_factor;
        if !ef.is_finite() || ef < MIN_EASINESS_FACTOR {
            return Err(EngineError::malformed(
                self.id.as_str(),
                format!("easiness factor {ef} below {MIN_EASINESS_FACTOR}"),
            ));
        }
        if self.interval_days < MIN_INTERVAL_DAYS {
            return Err(EngineError::malformed(
                self.id.as_str(),
                format!("interval {} below {MIN_INTERVAL_DAYS} day", self.interval_days),
            ));
        }
        let key = &self.key;
        if key.user_id.is_empty() || key.roadmap_id.is_empty() || key.topic_id.is_empty() {
            return Err(EngineError::malformed(
                self.id.as_str(),
                "missing identity field",
            ));
        }
        Ok(())
    }
}

/// Loosely typed record as it comes out of a store or a JSON document.
#[derive(Clone, Debug, Deserialize)]
pub struct RawReviewItem {
    pub id: String,
    pub user_id: Option<String>,
    pub roadmap_id: Option<String>,
    pub topic_id: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
    pub easiness_factor: Option<f64>,
    pub interval_days: Option<i64>,
    pub repetitions: Option<i64>,
    pub next_review_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_review_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_quality: Option<i64>,
    #[serde(default)]
    pub review_count: Option<i64>,
    #[serde(default)]
    pub version: Option<i64>,
}

fn required<T>(id: &str, field: &str, value: Option<T>) -> Result<T, EngineError> {
    value.ok_or_else(|| EngineError::malformed(id, format!("missing field `{field}`")))
}

fn non_negative(id: &str, field: &str, value: i64) -> Result<u32, EngineError> {
    u32::try_from(value)
        .map_err(|_| EngineError::malformed(id, format!("`{field}` out of range: {value}")))
}

impl TryFrom<RawReviewItem> for ReviewItem {
    type Error = EngineError;

    fn try_from(raw: RawReviewItem) -> Result<Self, Self::Error> {
        let id = raw.id.as_str();
        let last_quality = match raw.last_quality {
            Some(q) if !(0..=5).contains(&q) => {
                return Err(EngineError::malformed(
                    id,
                    format!("last quality {q} outside 0..=5"),
                ));
            }
            Some(q) => Some(Quality::clamped(q)),
            None => None,
        };
        let version = raw.version.unwrap_or(0);
        if version < 0 {
            return Err(EngineError::malformed(id, "negative version"));
        }

        let item = ReviewItem {
            key: ItemKey {
                user_id: required(id, "user_id", raw.user_id)?,
                roadmap_id: required(id, "roadmap_id", raw.roadmap_id)?,
                topic_id: required(id, "topic_id", raw.topic_id)?,
                question_id: raw.question_id,
            },
            easiness_factor: required(id, "easiness_factor", raw.easiness_factor)?,
            interval_days: non_negative(
                id,
                "interval_days",
                required(id, "interval_days", raw.interval_days)?,
            )?,
            repetitions: non_negative(
                id,
                "repetitions",
                required(id, "repetitions", raw.repetitions)?,
            )?,
            next_review_at: required(id, "next_review_at", raw.next_review_at)?,
            last_review_at: raw.last_review_at,
            last_quality,
            review_count: non_negative(id, "review_count", raw.review_count.unwrap_or(0))?,
            version: version as u64,
            id: ItemId(raw.id.clone()),
        };
        item.validate()?;
        Ok(item)
    }
}
