//! In-process remote store with a reachability switch

use super::RemoteStore;
use crate::error::{TierError, TierResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

type Tables = BTreeMap<String, BTreeMap<String, Value>>;

/// Map-backed store that can be taken "offline"
#[derive(Debug)]
pub struct MemoryRemoteStore {
    tables: Mutex<Tables>,
    reachable: AtomicBool,
    writes: AtomicUsize,
    write_delays: Mutex<VecDeque<Duration>>,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(BTreeMap::new()),
            reachable: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
            write_delays: Mutex::new(VecDeque::new()),
        }
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the network going away (or coming back)
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Latency for the next writes, one delay per `set`, in call order
    pub fn delay_writes(&self, delays: impl IntoIterator<Item = Duration>) {
        self.write_delays
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(delays);
    }

    /// Direct read that ignores reachability
    pub fn peek(&self, table: &str, key: &str) -> Option<Value> {
        self.lock().get(table).and_then(|t| t.get(key)).cloned()
    }

    /// Direct write that ignores reachability
    pub fn seed(&self, table: &str, key: &str, record: Value) {
        self.lock()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), record);
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn ensure_reachable(&self) -> TierResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TierError::RemoteStoreUnavailable(
                "simulated network error".to_string(),
            ))
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get(&self, table: &str, key: &str) -> TierResult<Option<Value>> {
        self.ensure_reachable()?;
        Ok(self.peek(table, key))
    }

    async fn set(&self, table: &str, key: &str, record: &Value) -> TierResult<()> {
        let delay = self
            .write_delays
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.ensure_reachable()?;
        self.seed(table, key, record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self, table: &str) -> TierResult<Vec<Value>> {
        self.ensure_reachable()?;
        Ok(self
            .lock()
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_owner(&self, table: &str) -> TierResult<()> {
        self.ensure_reachable()?;
        self.lock().remove(table);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
