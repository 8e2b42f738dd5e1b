//! Answer events supplied by the quiz and review screens.
use super::ItemId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvent {
    pub item_id: ItemId,
    pub correct: bool,
    pub response_time_ms: f64,
}

impl AnswerEvent {
    pub fn new(item_id: ItemId, correct: bool, response_time_ms: f64) -> Self {
        Self {
            item_id,
            correct,
            response_time_ms,
        }
    }
}

/// One answer given during the diagnostic assessment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResponse {
    pub question_id: String,
    pub answer: String,
}
