//! Time-bounded cache with an injected clock.
//!
//! Owned by whoever needs it and passed around explicitly; expiry is driven
//! by the [`Clock`] so tests can step past the TTL deterministically.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

struct State<K, V> {
    entries: HashMap<K, Entry<V>>,
    // Bumped by every removal, so a value computed before it can be refused.
    generation: u64,
}

pub struct TtlCache<K, V> {
    state: Mutex<State<K, V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                generation: 0,
            }),
            ttl,
            clock,
        }
    }

    fn state(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a live value; an expired one is dropped on the way.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.state();
        match state.entries.get(key) {
            Some(entry) if now - entry.stored_at < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Token to take before reading the data a value is computed from.
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Stores `value` only if nothing was removed since `generation` was
    /// taken. Returns whether it was stored.
    pub fn insert_if_current(&self, key: K, value: V, generation: u64) -> bool {
        let stored_at = self.clock.now();
        let mut state = self.state();
        if state.generation != generation {
            return false;
        }
        state.entries.insert(key, Entry { value, stored_at });
        true
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut state = self.state();
        state.generation = state.generation.wrapping_add(1);
        state.entries.remove(key).map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn setup() -> (Arc<ManualClock>, TtlCache<String, u32>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let cache = TtlCache::new(Duration::seconds(60), clock.clone());
        (clock, cache)
    }

    fn put(cache: &TtlCache<String, u32>, key: &str, value: u32) {
        assert!(cache.insert_if_current(key.to_string(), value, cache.generation()));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (clock, cache) = setup();
        put(&cache, "flags", 7);

        clock.advance(Duration::seconds(59));
        assert_eq!(cache.get(&"flags".to_string()), Some(7));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get(&"flags".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_refused_after_removal() {
        let (_clock, cache) = setup();
        let token = cache.generation();

        // a writer invalidates while the value is being computed
        cache.remove(&"u1:rust".to_string());

        assert!(!cache.insert_if_current("u1:rust".to_string(), 1, token));
        assert_eq!(cache.get(&"u1:rust".to_string()), None);

        let token = cache.generation();
        assert!(cache.insert_if_current("u1:rust".to_string(), 2, token));
        assert_eq!(cache.get(&"u1:rust".to_string()), Some(2));
    }

    #[test]
    fn test_remove_returns_value() {
        let (_clock, cache) = setup();
        put(&cache, "u1:rust", 1);
        put(&cache, "u2:rust", 3);

        assert_eq!(cache.remove(&"u2:rust".to_string()), Some(3));
        assert_eq!(cache.remove(&"u2:rust".to_string()), None);
        assert_eq!(cache.len(), 1);
    }
}
