//! Tiered cache resolver
//!
//! Resolution walks the tiers in order of increasing cost and never
//! reorders them:
//!
//! 1. local mirror (synchronous, no network)
//! 2. remote store (written through to the mirror on a hit)
//! 3. throttle check for the producer's resource class
//! 4. producer, whose result is written to both tiers
//!
//! Concurrent resolutions of the same key share one in-flight production,
//! so a double-submitted request costs one producer call and one cooldown.
//! Storage failures along the way are logged and absorbed; only
//! [`ResolveError`] reaches the caller.

use crate::clock::Clock;
use crate::content::{Artifact, CacheEntry, ContentClass, ContentKey};
use crate::error::ResolveError;
use crate::mirror::LocalMirror;
use crate::producer::{ChunkCallback, Producer, ProducerInvoker};
use crate::remote::RemoteStore;
use crate::throttle::ThrottleGuard;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

type InFlight = Shared<BoxFuture<'static, Result<Artifact, ResolveError>>>;

/// Snapshot of resolver activity since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub local_hits: u64,
    pub remote_hits: u64,
    pub productions: u64,
    pub coalesced: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    local_hits: AtomicU64,
    remote_hits: AtomicU64,
    productions: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ResolverStats {
        ResolverStats {
            local_hits: self.local_hits.load(Ordering::Relaxed),
            remote_hits: self.remote_hits.load(Ordering::Relaxed),
            productions: self.productions.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of a bulk purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    /// Mirror entries removed
    pub local_removed: usize,
    /// Whether every remote table was purged; false when local-only
    pub remote_cleared: bool,
}

struct Inner {
    mirror: Arc<dyn LocalMirror>,
    remote: Arc<dyn RemoteStore>,
    throttle: Arc<ThrottleGuard>,
    invoker: ProducerInvoker,
    clock: Arc<dyn Clock>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    counters: Counters,
}

/// Resolves content keys across mirror, remote store and producer
#[derive(Clone)]
pub struct CacheResolver {
    inner: Arc<Inner>,
}

impl CacheResolver {
    pub fn new(
        mirror: Arc<dyn LocalMirror>,
        remote: Arc<dyn RemoteStore>,
        throttle: Arc<ThrottleGuard>,
        invoker: ProducerInvoker,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                mirror,
                remote,
                throttle,
                invoker,
                clock,
                in_flight: Mutex::new(HashMap::new()),
                counters: Counters::default(),
            }),
        }
    }

    /// Throttle guard shared with other components
    pub fn throttle(&self) -> &Arc<ThrottleGuard> {
        &self.inner.throttle
    }

    pub fn stats(&self) -> ResolverStats {
        self.inner.counters.snapshot()
    }

    /// Resolve `key`, producing it only if neither tier has it
    pub async fn resolve(
        &self,
        key: &ContentKey,
        class: ContentClass,
        producer: Arc<dyn Producer>,
    ) -> Result<Artifact, ResolveError> {
        self.resolve_with_progress(key, class, producer, None).await
    }

    /// Like [`resolve`](Self::resolve), surfacing streamed chunks as they
    /// arrive.
    ///
    /// Only the caller that starts a production sees its chunks; callers
    /// that attach to an in-flight production just get the final artifact.
    pub async fn resolve_with_progress(
        &self,
        key: &ContentKey,
        class: ContentClass,
        producer: Arc<dyn Producer>,
        on_chunk: Option<ChunkCallback>,
    ) -> Result<Artifact, ResolveError> {
        let mirror_key = class.mirror_key(key);

        if let Some(entry) = self.inner.local_lookup(&mirror_key, key, class) {
            debug!("Local mirror hit for {}", key);
            Counters::bump(&self.inner.counters.local_hits);
            return Ok(entry.payload);
        }

        let pending = self.join_or_start(mirror_key, key.clone(), class, producer, on_chunk);
        pending.await
    }

    /// Attach to the in-flight resolution of this key, or start one
    fn join_or_start(
        &self,
        mirror_key: String,
        key: ContentKey,
        class: ContentClass,
        producer: Arc<dyn Producer>,
        on_chunk: Option<ChunkCallback>,
    ) -> InFlight {
        let mut in_flight = self.inner.lock_in_flight();

        if let Some(pending) = in_flight.get(&mirror_key) {
            debug!("Attaching to in-flight resolution of {}", key);
            Counters::bump(&self.inner.counters.coalesced);
            return pending.clone();
        }

        let inner = Arc::clone(&self.inner);
        let slot = mirror_key.clone();
        let pending = async move {
            let result = inner.fill(&key, class, producer, on_chunk).await;
            inner.lock_in_flight().remove(&slot);
            result
        }
        .boxed()
        .shared();

        in_flight.insert(mirror_key, pending.clone());
        pending
    }

    /// Purge cached content from both tiers.
    ///
    /// Profile, progress, vocabulary and history records are untouched.
    pub async fn clear_all(&self) -> ClearReport {
        let remote = self.inner.remote.is_configured();
        let mut report = ClearReport {
            local_removed: 0,
            remote_cleared: remote,
        };

        for table in ContentClass::tables() {
            match self.inner.mirror.remove_prefix(&format!("{}/", table)) {
                Ok(removed) => report.local_removed += removed,
                Err(e) => warn!("Failed to clear local {} entries: {}", table, e),
            }

            if !remote {
                continue;
            }
            if let Err(e) = self.inner.remote.delete_owner(table).await {
                warn!("Failed to clear remote {}: {}", table, e);
                report.remote_cleared = false;
            }
        }

        info!(
            "Cleared {} local entries (remote cleared: {})",
            report.local_removed, report.remote_cleared
        );
        report
    }
}

impl Inner {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn local_lookup(
        &self,
        mirror_key: &str,
        key: &ContentKey,
        class: ContentClass,
    ) -> Option<CacheEntry> {
        let raw = match self.mirror.get(mirror_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Local mirror read failed for {}, treating as miss: {}", key, e);
                return None;
            }
        };

        let Some(entry) = CacheEntry::from_mirror(&raw, key) else {
            warn!("Discarding malformed local entry for {}", key);
            return None;
        };

        if !entry.is_fresh(class, self.clock.now()) {
            debug!("Local entry for {} is stale", key);
            return None;
        }

        Some(entry)
    }

    async fn remote_lookup(&self, key: &ContentKey, class: ContentClass) -> Option<CacheEntry> {
        if !self.remote.is_configured() {
            return None;
        }

        let record = match self.remote.get(class.table(), key.as_str()).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Remote miss for {}", key);
                return None;
            }
            Err(e) => {
                warn!("{}; continuing without remote for {}", e, key);
                return None;
            }
        };

        let Some(entry) = CacheEntry::from_record(&record, key) else {
            warn!("Remote returned a malformed entry for {}, treating as miss", key);
            return None;
        };

        if !entry.is_fresh(class, self.clock.now()) {
            debug!("Remote entry for {} is stale", key);
            return None;
        }

        Some(entry)
    }

    /// Everything after the local mirror: remote, throttle, producer
    async fn fill(
        &self,
        key: &ContentKey,
        class: ContentClass,
        producer: Arc<dyn Producer>,
        on_chunk: Option<ChunkCallback>,
    ) -> Result<Artifact, ResolveError> {
        let mirror_key = class.mirror_key(key);

        // A production that finished after our first lookup has already
        // mirrored the entry and left the in-flight map
        if let Some(entry) = self.local_lookup(&mirror_key, key, class) {
            debug!("Local mirror hit for {} after in-flight check", key);
            Counters::bump(&self.counters.local_hits);
            return Ok(entry.payload);
        }

        if let Some(entry) = self.remote_lookup(key, class).await {
            debug!("Remote hit for {}", key);
            Counters::bump(&self.counters.remote_hits);
            self.write_local(&mirror_key, &entry);
            return Ok(entry.payload);
        }

        let resource_class = producer.resource_class();
        if let Some(resource_class) = &resource_class {
            self.throttle.check(resource_class)?;
        }

        let artifact = match self
            .invoker
            .invoke(producer.as_ref(), key, on_chunk.as_ref())
            .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                Counters::bump(&self.counters.failures);
                warn!("Production of {} failed: {}", key, e);
                return Err(e);
            }
        };

        if let Some(resource_class) = &resource_class {
            self.throttle.record_execution(resource_class);
        }
        Counters::bump(&self.counters.productions);

        let entry = CacheEntry::new(key.clone(), artifact.clone(), self.clock.now());
        self.write_remote(class, &entry).await;
        self.write_local(&mirror_key, &entry);

        Ok(artifact)
    }

    async fn write_remote(&self, class: ContentClass, entry: &CacheEntry) {
        if !self.remote.is_configured() {
            return;
        }

        let record = match serde_json::to_value(entry) {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not encode {} for the remote store: {}", entry.key, e);
                return;
            }
        };

        if let Err(e) = self
            .remote
            .set(class.table(), entry.key.as_str(), &record)
            .await
        {
            warn!("Remote write of {} dropped: {}", entry.key, e);
        }
    }

    fn write_local(&self, mirror_key: &str, entry: &CacheEntry) {
        if let Err(e) = crate::mirror::write_json(self.mirror.as_ref(), mirror_key, entry) {
            warn!("Local mirror write of {} failed, continuing: {}", entry.key, e);
        }
    }
}
