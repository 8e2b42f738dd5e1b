use crate::models::SkillStatus;

const MIN_CONFIDENCE: f64 = 0.2;
const STRONG_PROFICIENCY: f64 = 0.8;
const MODERATE_PROFICIENCY: f64 = 0.5;

/// Buckets a (proficiency, confidence) pair. Low confidence always wins.
pub fn classify(proficiency: f64, confidence: f64) -> SkillStatus {
    if confidence.is_nan() || confidence < MIN_CONFIDENCE {
        SkillStatus::Untested
    } else if proficiency >= STRONG_PROFICIENCY {
        SkillStatus::Strong
    } else if proficiency >= MODERATE_PROFICIENCY {
        SkillStatus::Moderate
    } else {
        SkillStatus::Weak
    }
}
