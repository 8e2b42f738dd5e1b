//! Topic-balanced sampling of an initial assessment.
//!
//! Questions are grouped by topic (in order of first appearance) and drawn
//! round-robin, one uniformly random unused question per topic visit, so
//! every topic is asked once before any topic is asked twice.

use crate::models::Question;
use rand::Rng;
use std::collections::{HashMap, HashSet};

const ROUNDS_PER_TOPIC: usize = 10;

pub fn select_diagnostic<'a, R>(
    questions: &[&'a Question],
    count: usize,
    rng: &mut R,
) -> Vec<&'a Question>
where
    R: Rng + ?Sized,
{
    let mut topic_order: Vec<&str> = Vec::new();
    let mut pools: HashMap<&str, Vec<&'a Question>> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for &question in questions {
        if !seen.insert(question.id.as_str()) {
            continue;
        }
        let topic = question.topic_id.as_str();
        pools
            .entry(topic)
            .or_insert_with(|| {
                topic_order.push(topic);
                Vec::new()
            })
            .push(question);
    }

    let available: usize = pools.values().map(Vec::len).sum();
    let target = count.min(available);
    let mut selected = Vec::with_capacity(target);

    // Exhausted topics leave the rotation, so every visit selects a question
    // and the bound below is never what ends a well-formed run.
    let max_visits = (ROUNDS_PER_TOPIC * topic_order.len()).max(available);
    let mut visits = 0;
    let mut cursor = 0;

    while selected.len() < target && !topic_order.is_empty() && visits < max_visits {
        visits += 1;
        cursor %= topic_order.len();
        let topic = topic_order[cursor];

        let Some(pool) = pools.get_mut(topic).filter(|pool| !pool.is_empty()) else {
            topic_order.remove(cursor);
            continue;
        };

        let pick = rng.gen_range(0..pool.len());
        selected.push(pool.swap_remove(pick));

        if pool.is_empty() {
            topic_order.remove(cursor);
        } else {
            cursor += 1;
        }
    }

    selected
}
