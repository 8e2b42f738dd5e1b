//! Dashboard-facing records derived from review history.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Strong,
    Moderate,
    Weak,
    Untested,
}

impl fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkillStatus::Strong => "strong",
            SkillStatus::Moderate => "moderate",
            SkillStatus::Weak => "weak",
            SkillStatus::Untested => "untested",
        };
        f.write_str(label)
    }
}

/// Per-topic mastery estimate. Recomputed from items, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillSummary {
    pub topic_id: String,
    pub proficiency: f64,
    pub confidence: f64,
    pub status: SkillStatus,
    pub item_count: usize,
    pub attempts: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total: usize,
    pub due: usize,
    pub upcoming: usize,
    pub mastered: usize,
    pub learning: usize,
    pub struggling: usize,
    /// Percentage in `0..=100`.
    pub retention: f64,
}
