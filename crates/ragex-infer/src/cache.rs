//! Query embedding cache.
//!
//! Ask-time queries repeat often enough that re-running the encoder is
//! wasted work. Bounded LRU with a TTL; document chunks are never cached
//! here, only query strings.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ndarray::Array1;
use parking_lot::Mutex;

struct Slot {
    embedding: Array1<f32>,
    stored_at: Instant,
}

/// Thread-safe LRU cache keyed by query text.
pub struct QueryCache {
    state: Mutex<State>,
}

struct State {
    slots: HashMap<String, Slot>,
    recency: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                slots: HashMap::with_capacity(capacity),
                recency: VecDeque::with_capacity(capacity),
                capacity,
                ttl,
            }),
        }
    }

    /// 1000 entries, one hour TTL.
    pub fn default_cache() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }

    /// Look up a query. Expired entries are dropped on access.
    pub fn lookup(&self, query: &str) -> Option<Array1<f32>> {
        let mut state = self.state.lock();

        let fresh = state.slots.get(query).map(|s| s.stored_at.elapsed() < state.ttl)?;
        if !fresh {
            state.slots.remove(query);
            state.recency.retain(|k| k != query);
            return None;
        }

        if let Some(pos) = state.recency.iter().position(|k| k == query) {
            let key = state.recency.remove(pos).unwrap_or_else(|| query.to_string());
            state.recency.push_back(key);
        }
        state.slots.get(query).map(|s| s.embedding.clone())
    }

    /// Store a query embedding, evicting the least recently used entry
    /// when full.
    pub fn store(&self, query: String, embedding: Array1<f32>) {
        let mut state = self.state.lock();

        if state.slots.contains_key(&query) {
            state.recency.retain(|k| k != &query);
        } else {
            while state.slots.len() >= state.capacity {
                match state.recency.pop_front() {
                    Some(oldest) => {
                        state.slots.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        state.recency.push_back(query.clone());
        state.slots.insert(
            query,
            Slot {
                embedding,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.slots.clear();
        state.recency.clear();
    }
}
