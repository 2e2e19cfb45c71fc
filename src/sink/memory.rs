//! In-memory key-value sink

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::KeyValueSink;
use crate::SinkError;

/// Sink that keeps every write in memory
///
/// Holds both the latest value per key and the full write log, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, String>,
    writes: Vec<(String, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value written for `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    /// Every write so far, oldest first
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl KeyValueSink for MemorySink {
    async fn set(&self, key: &str, value: &str) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.values.insert(key.to_string(), value.to_string());
        state.writes.push((key.to_string(), value.to_string()));
        Ok(())
    }
}
