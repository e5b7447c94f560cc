use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::FacadeError;
use crate::observability::metrics::get_metrics;

const HIT_MSG: &str = "hit";
const MISS_MSG: &str = "miss";

/// Cached value with its absolute expiry instant.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

struct SlotState<T, E> {
    entry: Option<CacheEntry<T>>,
    last_failure: Option<E>,
}

/// One key. `completed` counts finished populations so a caller that queued
/// behind a failing population can tell it was a waiter on that attempt.
struct Slot<T, E> {
    completed: AtomicU64,
    state: Mutex<SlotState<T, E>>,
}

/// Keyed TTL cache with single-flight population per key.
///
/// The outer map lock is only held to look up a slot; population runs under
/// the slot's own async lock, so distinct keys never wait on each other.
pub struct TtlCache<T, E = FacadeError> {
    slots: std::sync::Mutex<HashMap<String, Arc<Slot<T, E>>>>,
}

impl<T, E> Default for TtlCache<T, E> {
    fn default() -> Self {
        Self { slots: std::sync::Mutex::new(HashMap::new()) }
    }
}

impl<T: Clone, E: Clone + std::fmt::Display> TtlCache<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<Slot<T, E>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(key.to_owned())
            .or_insert_with(|| {
                Arc::new(Slot {
                    completed: AtomicU64::new(0),
                    state: Mutex::new(SlotState { entry: None, last_failure: None }),
                })
            })
            .clone()
    }

    /// Fresh cached value for `key`, or the result of a single `populate` call.
    ///
    /// Callers that waited on a failing population receive that same error.
    /// A failure never removes the previous entry.
    pub async fn get_or_populate<F, Fut>(&self, key: &str, ttl: Duration, populate: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let metrics = get_metrics().await;
        let slot = self.slot(key);
        let ticket = slot.completed.load(Ordering::Acquire);
        let mut state = slot.state.lock().await;

        if let Some(entry) = state.entry.as_ref().filter(|e| e.is_fresh(Instant::now())) {
            metrics.cache_lookups.with_label_values(&[key, HIT_MSG]).inc();
            return Ok(entry.value.clone());
        }

        if slot.completed.load(Ordering::Acquire) != ticket {
            if let Some(err) = state.last_failure.clone() {
                debug!(key, "sharing failure of the population this caller waited on");
                return Err(err);
            }
        }

        metrics.cache_lookups.with_label_values(&[key, MISS_MSG]).inc();
        debug!(key, ttl_secs = ttl.as_secs(), "populating cache entry");
        let result = populate().await;
        match &result {
            Ok(value) => {
                state.entry = Some(CacheEntry { value: value.clone(), expires_at: Instant::now() + ttl });
                state.last_failure = None;
            }
            Err(err) => {
                metrics.cache_population_failures.with_label_values(&[key]).inc();
                warn!(key, error = %err, "cache population failed");
                state.last_failure = Some(err.clone());
            }
        }
        slot.completed.fetch_add(1, Ordering::AcqRel);

        result
    }
}
