//! Maps a raw answer outcome to an SM-2 recall quality.
//!
//! Correct answers are graded by speed relative to the learner's average
//! response time and never score below 3. Incorrect answers score 1 when
//! given in under half the average time and 0 otherwise.

use crate::models::Quality;

const FAST_RATIO: f64 = 0.3;
const HESITANT_RATIO: f64 = 0.6;
const QUICK_MISS_RATIO: f64 = 0.5;

/// Timer readings come from the UI and may be garbage; never fail on them.
fn sanitize_ms(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn untimed(correct: bool) -> Quality {
    if correct { Quality::new(3) } else { Quality::new(0) }
}

pub fn classify(correct: bool, response_time_ms: f64, avg_time_ms: f64) -> Quality {
    // A broken timer must not earn the fast-answer grades.
    if !response_time_ms.is_finite() {
        return untimed(correct);
    }
    let response = sanitize_ms(response_time_ms);
    let avg = sanitize_ms(avg_time_ms);

    // Without a baseline the timing carries no signal.
    if avg <= 0.0 {
        return untimed(correct);
    }

    if correct {
        let ratio = response / avg;
        if ratio < FAST_RATIO {
            Quality::new(5)
        } else if ratio < HESITANT_RATIO {
            Quality::new(4)
        } else {
            Quality::new(3)
        }
    } else if response < QUICK_MISS_RATIO * avg {
        // NOTE: a quick miss outranks a slow one here. Kept as-is until the
        // product decides whether fast guessing should be penalized more.
        Quality::new(1)
    } else {
        Quality::new(0)
    }
}
