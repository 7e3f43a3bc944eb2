//! Presentation sinks.
//!
//! The scheduler publishes human-readable status strings under fixed keys
//! and never reads them back. Where they end up is the sink's business:
//! the live terminal view, the log, or memory (tests).

pub mod layout;
pub mod terminal;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Key-addressed, write-only status surface.
pub trait PresentationSink: Send {
    /// Show `text` at the location bound to `key`. Unknown keys are ignored.
    fn render(&mut self, key: &str, text: &str) -> Result<()>;
}

/// Headless sink: forwards every render to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl PresentationSink for TracingSink {
    fn render(&mut self, key: &str, text: &str) -> Result<()> {
        debug!(key, text, "status");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    history: Vec<(String, String)>,
}

/// In-memory sink. Clones share the same storage, so a test can keep one
/// handle while the monitor owns another.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Last text rendered under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    /// Every text rendered under `key`, oldest first.
    pub fn renders_for(&self, key: &str) -> Vec<String> {
        self.lock()
            .history
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn clear_history(&self) {
        self.lock().history.clear();
    }
}

impl PresentationSink for MemorySink {
    fn render(&mut self, key: &str, text: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.values.insert(key.to_string(), text.to_string());
        inner.history.push((key.to_string(), text.to_string()));
        Ok(())
    }
}
