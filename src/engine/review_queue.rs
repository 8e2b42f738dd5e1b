//! Due-item selection and aggregate review statistics.

use crate::models::{ReviewItem, ReviewStats};
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_MAX_ITEMS: usize = 20;

const MASTERED_REPETITIONS: u32 = 5;
const MASTERED_EASINESS: f64 = 2.5;
const STRUGGLING_EASINESS: f64 = 1.8;

/// Items due at `now`, most overdue first, at most `max_items` of them.
pub fn due_items<'a, I>(items: I, now: DateTime<Utc>, max_items: usize) -> Vec<ReviewItem>
where
    I: IntoIterator<Item = &'a ReviewItem>,
{
    let mut due: Vec<ReviewItem> = items
        .into_iter()
        .filter(|item| item.is_due(now))
        .cloned()
        .collect();

    // Stable sort keeps store order among items due at the same instant.
    due.sort_by_key(|item| item.next_review_at);
    due.truncate(max_items);
    due
}

pub fn is_mastered(item: &ReviewItem) -> bool {
    item.repetitions >= MASTERED_REPETITIONS && item.easiness_factor >= MASTERED_EASINESS
}

pub fn stats(items: &[ReviewItem], now: DateTime<Utc>) -> ReviewStats {
    let horizon = now + Duration::hours(24);

    let mut stats = ReviewStats {
        total: items.len(),
        ..ReviewStats::default()
    };
    let mut reviewed = 0usize;
    let mut recalled = 0usize;

    for item in items {
        if item.next_review_at <= now {
            stats.due += 1;
        } else if item.next_review_at <= horizon {
            stats.upcoming += 1;
        }
        if is_mastered(item) {
            stats.mastered += 1;
        }
        if item.repetitions > 0 && item.repetitions < MASTERED_REPETITIONS {
            stats.learning += 1;
        }
        if item.easiness_factor < STRUGGLING_EASINESS {
            stats.struggling += 1;
        }
        if let Some(quality) = item.last_quality {
            reviewed += 1;
            if quality.is_recall() {
                recalled += 1;
            }
        }
    }

    stats.retention = if reviewed == 0 {
        100.0
    } else {
        recalled as f64 / reviewed as f64 * 100.0
    };
    stats
}
