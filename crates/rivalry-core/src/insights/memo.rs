//! Short-lived memoization of Stage A
//!
//! Wraps any `SignalSource` and reuses its output for identical input within
//! a TTL. The key is a stable hash of the input plus the generation context,
//! so two runs at different instants never share signal ids.

use serde_json::json;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::hash::stable_hash;
use crate::models::GenerationContext;

use super::input::InsightsInput;
use super::signals::SignalSource;
use super::types::Signal;

type Entries = HashMap<String, (Instant, Vec<Signal>)>;

pub struct MemoizedSignalGenerator<S: SignalSource> {
    inner: S,
    ttl: Duration,
    entries: Mutex<Entries>,
}

impl<S: SignalSource> MemoizedSignalGenerator<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of cached inputs, expired or not
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    fn key(input: &InsightsInput, ctx: &GenerationContext) -> Option<String> {
        match stable_hash(&json!({ "input": input, "context": ctx })) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(error = %e, "Could not hash signal input, skipping memo");
                None
            }
        }
    }
}

impl<S: SignalSource> SignalSource for MemoizedSignalGenerator<S> {
    fn generate(&self, input: &InsightsInput, ctx: &GenerationContext) -> Vec<Signal> {
        let Some(key) = Self::key(input, ctx) else {
            return self.inner.generate(input, ctx);
        };

        let now = Instant::now();
        if let Some((stored_at, signals)) = self.entries().get(&key) {
            if now.duration_since(*stored_at) < self.ttl {
                tracing::debug!(key = %&key[..12], "Signal memo hit");
                return signals.clone();
            }
        }

        let signals = self.inner.generate(input, ctx);
        let mut entries = self.entries();
        entries.retain(|_, (stored_at, _)| now.duration_since(*stored_at) < self.ttl);
        entries.insert(key, (now, signals.clone()));
        signals
    }
}
