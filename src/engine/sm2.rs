//! SM-2 (SuperMemo 2) spaced repetition scheduling.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each item has an easiness factor (EF) that adjusts after a recall
//! - Quality 0-2: repetitions reset to 0 and the item comes back tomorrow
//! - Quality 3-5: interval grows 1 day → 6 days → previous interval × EF
//! - EF never falls below 1.3, on any path

use crate::models::review_item::{MIN_EASINESS_FACTOR, MIN_INTERVAL_DAYS};
use crate::models::{Quality, ReviewItem};
use chrono::{DateTime, Duration, Utc};

/// Scheduling state produced by one review.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Schedule {
    pub easiness_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub next_review_at: DateTime<Utc>,
}

/// Advances one item's scheduling state. Total for every input.
pub fn advance(
    quality: impl Into<Quality>,
    prev_ef: f64,
    prev_interval: u32,
    prev_repetitions: u32,
    now: DateTime<Utc>,
) -> Schedule {
    let quality = quality.into();

    let (ef, interval, repetitions) = if quality.is_recall() {
        let repetitions = prev_repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => (prev_interval as f64 * prev_ef).round() as u32,
        };
        // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
        let miss = (5 - quality.value()) as f64;
        let ef = prev_ef + (0.1 - miss * (0.08 + miss * 0.02));
        (ef, interval, repetitions)
    } else {
        (prev_ef, 1, 0)
    };

    // f64::max drops a NaN operand, so a corrupt EF also lands on the floor.
    let easiness_factor = ef.max(MIN_EASINESS_FACTOR);
    let interval_days = interval.max(MIN_INTERVAL_DAYS);

    Schedule {
        easiness_factor,
        interval_days,
        repetitions,
        next_review_at: now
            .checked_add_signed(Duration::days(interval_days as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

/// Returns `item` after answering it with `quality` at `now`.
pub fn apply(item: &ReviewItem, quality: Quality, now: DateTime<Utc>) -> ReviewItem {
    let schedule = advance(
        quality,
        item.easiness_factor,
        item.interval_days,
        item.repetitions,
        now,
    );

    ReviewItem {
        easiness_factor: schedule.easiness_factor,
        interval_days: schedule.interval_days,
        repetitions: schedule.repetitions,
        next_review_at: schedule.next_review_at,
        last_review_at: Some(now),
        last_quality: Some(quality),
        review_count: item.review_count.saturating_add(1),
        ..item.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKey;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_first_review() {
        let next = advance(Quality::new(5), 2.5, 1, 0, now());
        assert_close(next.easiness_factor, 2.6);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.next_review_at, now() + Duration::days(1));
    }

    #[test]
    fn test_fresh_item_trace() {
        let first = advance(Quality::new(5), 2.5, 1, 0, now());
        let second = advance(
            Quality::new(4),
            first.easiness_factor,
            first.interval_days,
            first.repetitions,
            now(),
        );
        assert_close(second.easiness_factor, 2.6);
        assert_eq!(second.interval_days, 6);
        assert_eq!(second.repetitions, 2);

        let third = advance(
            Quality::new(3),
            second.easiness_factor,
            second.interval_days,
            second.repetitions,
            now(),
        );
        assert_close(third.easiness_factor, 2.46);
        // round(6 * 2.6), using the EF from before this review
        assert_eq!(third.interval_days, 16);
        assert_eq!(third.repetitions, 3);
        assert_eq!(third.next_review_at, now() + Duration::days(16));
    }

    #[test]
    fn test_quality_below_3_resets() {
        for q in 0..3u8 {
            let next = advance(Quality::new(q), 2.5, 10, 5, now());
            assert_eq!(next.interval_days, 1);
            assert_eq!(next.repetitions, 0);
            // a lapse leaves EF alone
            assert_close(next.easiness_factor, 2.5);
        }
    }

    #[test]
    fn test_ef_floor() {
        let efs = [1.0, 1.3, 1.31, 1.7, 2.5, 3.2, f64::NAN];
        for &ef in &efs {
            for q in 0..=5u8 {
                let next = advance(Quality::new(q), ef, 4, 3, now());
                assert!(next.easiness_factor >= 1.3, "ef {ef} q {q}");
                assert!(next.interval_days >= 1);
            }
        }
    }

    #[test]
    fn test_out_of_range_quality_is_clamped() {
        let high = advance(99i32, 2.5, 1, 0, now());
        assert_eq!(high, advance(Quality::new(5), 2.5, 1, 0, now()));

        let low = advance(-7i32, 2.5, 6, 2, now());
        assert_eq!(low.repetitions, 0);
        assert_eq!(low.interval_days, 1);
    }

    #[test]
    fn test_zero_interval_history_still_schedules_a_day() {
        let next = advance(Quality::new(4), 2.5, 0, 2, now());
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn test_apply_stamps_review() {
        let item = ReviewItem::enroll(ItemKey::new("u1", "rust", "traits"), now());
        let later = now() + Duration::hours(2);

        let reviewed = apply(&item, Quality::new(4), later);
        assert_eq!(reviewed.id, item.id);
        assert_eq!(reviewed.version, item.version);
        assert_eq!(reviewed.repetitions, 1);
        assert_eq!(reviewed.review_count, 1);
        assert_eq!(reviewed.last_review_at, Some(later));
        assert_eq!(reviewed.last_quality, Some(Quality::new(4)));
        assert_eq!(reviewed.next_review_at, later + Duration::days(1));
    }
}
