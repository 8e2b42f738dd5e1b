//! Review session over a learner's due queue.
//! Handles multi-round review: items answered below the recall threshold
//! are repeated in later rounds until every item has been recalled once.

use crate::error::Result;
use crate::models::{AnswerEvent, ReviewItem};
use crate::service::AdaptiveEngine;
use crate::store::ItemStore;

pub struct ReviewSession {
    pub user_id: String,
    pub roadmap_id: Option<String>,
    items: Vec<ReviewItem>,
    recalled: Vec<bool>,
    current_round: Vec<usize>,
    current_index: usize,
    round_number: usize,
    avg_time_ms: f64,
    timed_answers: u32,
}

impl ReviewSession {
    /// Starts a session from whatever is due right now.
    pub fn start<S: ItemStore>(
        engine: &AdaptiveEngine<S>,
        user_id: &str,
        roadmap_id: Option<&str>,
    ) -> Result<Self> {
        let items = engine.due_queue(user_id, roadmap_id, None)?;
        let avg = engine.config().default_avg_response_ms;
        Ok(Self::from_items(user_id, roadmap_id, items, avg))
    }

    pub fn from_items(
        user_id: &str,
        roadmap_id: Option<&str>,
        items: Vec<ReviewItem>,
        baseline_avg_ms: f64,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            roadmap_id: roadmap_id.map(str::to_string),
            recalled: vec![false; items.len()],
            current_round: (0..items.len()).collect(),
            items,
            current_index: 0,
            round_number: 1,
            avg_time_ms: baseline_avg_ms,
            timed_answers: 0,
        }
    }

    pub fn current_item(&self) -> Option<&ReviewItem> {
        self.current_round
            .get(self.current_index)
            .and_then(|&idx| self.items.get(idx))
    }

    /// Records an answer to the current item and moves on.
    /// The timing baseline is the mean of this session's answers so far,
    /// seeded with the configured default.
    pub fn answer<S: ItemStore>(
        &mut self,
        engine: &AdaptiveEngine<S>,
        correct: bool,
        response_time_ms: f64,
    ) -> Result<Option<ReviewItem>> {
        let Some(&idx) = self.current_round.get(self.current_index) else {
            return Ok(None);
        };

        let event = AnswerEvent::new(self.items[idx].id.clone(), correct, response_time_ms);
        let updated = engine.record_answer(&event, self.avg_time_ms)?;

        self.recalled[idx] = updated.last_quality.is_some_and(|q| q.is_recall());
        self.items[idx] = updated.clone();
        self.track_time(response_time_ms);

        self.current_index += 1;
        if self.current_index >= self.current_round.len() {
            self.start_next_round();
        }
        Ok(Some(updated))
    }

    fn track_time(&mut self, response_time_ms: f64) {
        if !response_time_ms.is_finite() || response_time_ms <= 0.0 {
            return;
        }
        let n = self.timed_answers as f64 + 1.0;
        self.avg_time_ms += (response_time_ms - self.avg_time_ms) / (n + 1.0);
        self.timed_answers += 1;
    }

    /// Starts a new round with items that weren't recalled.
    /// If no items remain, the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round
            .iter()
            .copied()
            .filter(|&idx| !self.recalled[idx])
            .collect();

        self.current_index = 0;
        if failed.is_empty() {
            self.current_round.clear();
        } else {
            self.current_round = failed;
            self.round_number += 1;
        }
    }

    pub fn items(&self) -> &[ReviewItem] {
        &self.items
    }

    pub fn baseline_ms(&self) -> f64 {
        self.avg_time_ms
    }

    pub fn round_number(&self) -> usize {
        self.round_number
    }

    pub fn recalled_count(&self) -> usize {
        self.recalled.iter().filter(|&&r| r).count()
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.recalled_count()
    }

    pub fn is_completed(&self) -> bool {
        self.current_round.is_empty()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} items", self.round_number, self.current_round.len())
        } else {
            format!(
                "Round {} (Review): {} items to retry",
                self.round_number,
                self.current_round.len()
            )
        }
    }
}
