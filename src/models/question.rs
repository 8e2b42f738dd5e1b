//! Diagnostic question bank. Entries are immutable once loaded.
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub roadmap_id: String,
    pub topic_id: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl Question {
    /// Exact match after trimming surrounding whitespace.
    pub fn check_answer(&self, answer: &str) -> bool {
        self.correct_answer.trim() == answer.trim()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuestionBank {
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn for_roadmap(&self, roadmap_id: &str) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| q.roadmap_id == roadmap_id)
            .collect()
    }

    pub fn get(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
