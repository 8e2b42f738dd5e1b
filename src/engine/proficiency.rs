//! Decay-weighted topic mastery.
//!
//! Each item scores on its last recall quality, its current streak and its
//! easiness factor, then fades with time since it was last reviewed
//! (`exp(-days / 30)`). A topic's proficiency is the mean over its items, so
//! a topic mastered long ago and never revisited drifts back toward zero.

use super::skill_status;
use crate::models::review_item::{DEFAULT_EASINESS_FACTOR, MIN_EASINESS_FACTOR};
use crate::models::{ReviewItem, SkillSummary};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const DECAY_DAYS: f64 = 30.0;
const QUALITY_WEIGHT: f64 = 0.5;
const REPETITION_WEIGHT: f64 = 0.3;
const REPETITION_SATURATION: f64 = 5.0;
const EASINESS_WEIGHT: f64 = 0.2;

pub const DEFAULT_CONFIDENCE_SATURATION: u32 = 10;

const MS_PER_DAY: f64 = 86_400_000.0;

fn recency_weight(item: &ReviewItem, now: DateTime<Utc>) -> f64 {
    match item.last_review_at {
        Some(at) => {
            let days = ((now - at).num_milliseconds() as f64 / MS_PER_DAY).max(0.0);
            (-days / DECAY_DAYS).exp()
        }
        None => 0.0,
    }
}

/// Score of one item. An easiness factor above the default earns a bonus
/// above 0.2, so a single item may score slightly over 1; `estimate` clamps
/// the topic mean.
pub fn item_score(item: &ReviewItem, now: DateTime<Utc>) -> f64 {
    let quality_score = item
        .last_quality
        .map(|q| q.value() as f64 / 5.0)
        .unwrap_or(0.0);
    let repetition_bonus =
        (item.repetitions as f64 / REPETITION_SATURATION).min(1.0) * REPETITION_WEIGHT;
    let easiness_bonus = (item.easiness_factor - MIN_EASINESS_FACTOR)
        / (DEFAULT_EASINESS_FACTOR - MIN_EASINESS_FACTOR)
        * EASINESS_WEIGHT;

    (quality_score * QUALITY_WEIGHT + repetition_bonus + easiness_bonus) * recency_weight(item, now)
}

/// Proficiency in `[0, 1]` for one topic's items; 0 when there are none.
pub fn estimate(items: &[ReviewItem], now: DateTime<Utc>) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let total: f64 = items.iter().map(|item| item_score(item, now)).sum();
    (total / items.len() as f64).clamp(0.0, 1.0)
}

/// Certainty from sample size alone, saturating at `saturation` attempts.
pub fn confidence(attempts: u32, saturation: u32) -> f64 {
    if saturation == 0 {
        return 1.0;
    }
    (attempts as f64 / saturation as f64).min(1.0)
}

/// One summary per topic, ordered by topic id.
pub fn summarize(
    items: &[ReviewItem],
    now: DateTime<Utc>,
    confidence_saturation: u32,
) -> Vec<SkillSummary> {
    let mut by_topic: BTreeMap<&str, Vec<ReviewItem>> = BTreeMap::new();
    for item in items {
        by_topic
            .entry(item.key.topic_id.as_str())
            .or_default()
            .push(item.clone());
    }

    by_topic
        .into_iter()
        .map(|(topic_id, topic_items)| {
            let attempts = topic_items
                .iter()
                .fold(0u32, |acc, item| acc.saturating_add(item.review_count));
            let proficiency = estimate(&topic_items, now);
            let confidence = confidence(attempts, confidence_saturation);
            SkillSummary {
                topic_id: topic_id.to_string(),
                proficiency,
                confidence,
                status: skill_status::classify(proficiency, confidence),
                item_count: topic_items.len(),
                attempts,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemKey, Quality, SkillStatus};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
    }

    fn reviewed(topic: &str, days_ago: i64, quality: u8, reps: u32, ef: f64) -> ReviewItem {
        let mut item = ReviewItem::enroll(ItemKey::new("u1", "rust", topic), now());
        item.last_review_at = Some(now() - Duration::days(days_ago));
        item.last_quality = Some(Quality::new(quality));
        item.repetitions = reps;
        item.easiness_factor = ef;
        item.review_count = reps.max(1);
        item
    }

    #[test]
    fn test_empty_topic_is_zero() {
        assert_eq!(estimate(&[], now()), 0.0);
    }

    #[test]
    fn test_recent_review_beats_old_one() {
        let today = reviewed("traits", 0, 5, 5, 2.6);
        let old = reviewed("traits", 90, 5, 5, 2.6);

        let fresh_score = estimate(&[today], now());
        let stale_score = estimate(&[old], now());
        assert!(fresh_score > stale_score);
        assert!((fresh_score - 1.0).abs() < 1e-9);
        assert!(stale_score < 0.06);
    }

    #[test]
    fn test_formula_components() {
        // 0.5 * 4/5 + 0.3 * 2/5 + 0.2 * (1.9 - 1.3) / 1.2, no decay
        let item = reviewed("traits", 0, 4, 2, 1.9);
        let expected = 0.4 + 0.12 + 0.1;
        assert!((item_score(&item, now()) - expected).abs() < 1e-9);

        let month_old = reviewed("traits", 30, 4, 2, 1.9);
        assert!((item_score(&month_old, now()) - expected * (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_easiness_above_default_keeps_full_bonus() {
        // EF 3.0 is reachable: five perfect answers, a lapse, three good ones
        let item = reviewed("lifetimes", 0, 4, 3, 3.0);
        let expected = 0.4 + 0.18 + 0.2 * (3.0 - 1.3) / 1.2;
        assert!((item_score(&item, now()) - expected).abs() < 1e-9);
        assert!((estimate(&[item.clone()], now()) - expected).abs() < 1e-9);

        let mut item = item;
        item.review_count = 9;
        let summaries = summarize(&[item], now(), DEFAULT_CONFIDENCE_SATURATION);
        assert_eq!(summaries[0].status, SkillStatus::Strong);
    }

    #[test]
    fn test_never_reviewed_contributes_nothing() {
        let item = ReviewItem::enroll(ItemKey::new("u1", "rust", "macros"), now());
        assert_eq!(item_score(&item, now()), 0.0);

        let strong = reviewed("macros", 0, 5, 5, 2.5);
        assert!((estimate(&[strong, item], now()) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_future_review_timestamp_does_not_inflate() {
        let mut item = reviewed("traits", 0, 5, 5, 2.5);
        item.last_review_at = Some(now() + Duration::days(3));
        assert!((item_score(&item, now()) - 1.0).abs() < 1e-9);

        let mut easy = reviewed("traits", 0, 5, 5, 3.2);
        easy.last_review_at = Some(now() + Duration::days(3));
        assert_eq!(estimate(&[easy], now()), 1.0);
    }

    #[test]
    fn test_confidence_saturates() {
        assert_eq!(confidence(0, 10), 0.0);
        assert_eq!(confidence(5, 10), 0.5);
        assert_eq!(confidence(25, 10), 1.0);
        assert_eq!(confidence(3, 0), 1.0);
    }

    #[test]
    fn test_summarize_groups_by_topic() {
        let mut strong = reviewed("ownership", 0, 5, 5, 2.5);
        strong.review_count = 12;
        let barely = reviewed("generics", 1, 4, 1, 2.5);

        let summaries = summarize(&[strong, barely], now(), DEFAULT_CONFIDENCE_SATURATION);
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].topic_id, "generics");
        assert_eq!(summaries[0].attempts, 1);
        assert_eq!(summaries[0].status, SkillStatus::Untested);

        assert_eq!(summaries[1].topic_id, "ownership");
        assert_eq!(summaries[1].confidence, 1.0);
        assert_eq!(summaries[1].status, SkillStatus::Strong);
    }
}
