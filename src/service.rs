//! The engine as seen by the rest of the application: answer events in,
//! due queues, statistics and skill summaries out.

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::engine::{proficiency, quality, review_queue, sm2};
use crate::error::{EngineError, Result};
use crate::models::{
    AnswerEvent, DiagnosticResponse, ItemKey, QuestionBank, ReviewItem, ReviewStats, SkillSummary,
};
use crate::store::ItemStore;
use chrono::Duration;
use std::sync::Arc;

type SummaryKey = (String, String);

const MAX_CACHE_TTL_SECS: u64 = 365 * 86_400;

pub struct AdaptiveEngine<S: ItemStore> {
    store: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    skill_cache: TtlCache<SummaryKey, Vec<SkillSummary>>,
}

impl<S: ItemStore> AdaptiveEngine<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let ttl = Duration::seconds(config.skill_cache_ttl_secs.min(MAX_CACHE_TTL_SECS) as i64);
        Self {
            skill_cache: TtlCache::new(ttl, clock.clone()),
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn invalidate_summaries(&self, key: &ItemKey) {
        self.skill_cache
            .remove(&(key.user_id.clone(), key.roadmap_id.clone()));
    }

    /// Returns the item for `key`, creating a fresh one if needed.
    pub fn enroll(&self, key: ItemKey) -> Result<ReviewItem> {
        if let Some(existing) = self.store.find(&key)? {
            return Ok(existing);
        }

        let item = ReviewItem::enroll(key, self.clock.now());
        match self.store.upsert(&item) {
            Ok(stored) => {
                tracing::debug!(
                    item_id = %stored.id,
                    topic = %stored.key.topic_id,
                    "enrolled review item"
                );
                self.invalidate_summaries(&stored.key);
                Ok(stored)
            }
            // Lost an enrollment race; the other writer's item is the one.
            Err(EngineError::Conflict { .. }) => self
                .store
                .find(&item.key)?
                .ok_or_else(|| EngineError::NotFound(item.id.clone())),
            Err(err) => Err(err),
        }
    }

    /// Grades the answer and advances the item in one versioned write.
    ///
    /// A write that loses to a concurrent review is retried against the
    /// fresh state, up to `max_write_attempts` times.
    pub fn record_answer(&self, event: &AnswerEvent, avg_time_ms: f64) -> Result<ReviewItem> {
        let quality = quality::classify(event.correct, event.response_time_ms, avg_time_ms);
        let attempts = self.config.max_write_attempts.max(1);

        let mut attempt = 1;
        loop {
            let current = self.store.get(&event.item_id)?;
            let advanced = sm2::apply(&current, quality, self.clock.now());

            match self.store.upsert(&advanced) {
                Ok(stored) => {
                    tracing::debug!(
                        item_id = %stored.id,
                        quality = quality.value(),
                        interval_days = stored.interval_days,
                        repetitions = stored.repetitions,
                        easiness_factor = stored.easiness_factor,
                        "review item advanced"
                    );
                    self.invalidate_summaries(&stored.key);
                    return Ok(stored);
                }
                Err(EngineError::Conflict { .. }) if attempt < attempts => {
                    tracing::warn!(
                        item_id = %event.item_id,
                        attempt,
                        "review write conflict, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Enrolls the topic of every diagnostic question answered wrongly.
    /// Unknown question ids are skipped.
    pub fn record_diagnostic(
        &self,
        user_id: &str,
        bank: &QuestionBank,
        responses: &[DiagnosticResponse],
    ) -> Result<Vec<ReviewItem>> {
        let mut enrolled = Vec::new();
        for response in responses {
            let Some(question) = bank.get(&response.question_id) else {
                tracing::warn!(question_id = %response.question_id, "unknown diagnostic question");
                continue;
            };
            if question.check_answer(&response.answer) {
                continue;
            }
            let key = ItemKey::new(user_id, &question.roadmap_id, &question.topic_id)
                .with_question(&question.id);
            enrolled.push(self.enroll(key)?);
        }
        Ok(enrolled)
    }

    pub fn due_queue(
        &self,
        user_id: &str,
        roadmap_id: Option<&str>,
        max_items: Option<usize>,
    ) -> Result<Vec<ReviewItem>> {
        let now = self.clock.now();
        let items = self.store.list_due(user_id, roadmap_id, now)?;
        let limit = max_items.unwrap_or(self.config.max_due_items);
        Ok(review_queue::due_items(&items, now, limit))
    }

    pub fn review_stats(&self, user_id: &str, roadmap_id: Option<&str>) -> Result<ReviewStats> {
        let items = self.store.list_items(user_id, roadmap_id)?;
        Ok(review_queue::stats(&items, self.clock.now()))
    }

    pub fn skill_summaries(&self, user_id: &str, roadmap_id: &str) -> Result<Vec<SkillSummary>> {
        let cache_key = (user_id.to_string(), roadmap_id.to_string());
        if let Some(cached) = self.skill_cache.get(&cache_key) {
            return Ok(cached);
        }

        // Taken before the read: an answer recorded meanwhile invalidates
        // the key, and the summary below must then not be cached.
        let generation = self.skill_cache.generation();
        let items = self.store.list_items(user_id, Some(roadmap_id))?;
        let summaries = proficiency::summarize(
            &items,
            self.clock.now(),
            self.config.confidence_saturation,
        );
        if !self
            .skill_cache
            .insert_if_current(cache_key, summaries.clone(), generation)
        {
            tracing::debug!(user_id, roadmap_id, "skill summaries changed during read, not cached");
        }
        Ok(summaries)
    }
}
