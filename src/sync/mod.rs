//! Sync orchestrator for user records
//!
//! Writes land in the local mirror synchronously, so a read straight after
//! a write sees it. The matching remote write is queued to a single
//! background writer and never awaited by the caller. The writer applies
//! queued writes one at a time in submission order, so the remote store
//! ends up with the last write. A failed write is logged, handed to the
//! optional error sink and dropped. There is no retry queue.
//!
//! Reads prefer the remote store when it answers and replace the local copy
//! with whole records. Reads first wait for this process's own pending
//! writes, so a reachable remote never shadows a write issued a moment ago.
//!
//! | Record | Mirror key | Remote table | Remote key |
//! |--------|------------|--------------|------------|
//! | profile stats | `profile` | `profiles` | `stats` |
//! | chapter progress | `progress` | `user_progress` | chapter id |
//! | vocabulary vault | `vocab` | `user_vocabulary` | term |
//! | history | `history` | `history` | item id |

mod history;
mod profile;
mod progress;
mod vocab;

pub use history::{streak_from_dates, HistoryItem, SyncSource, HISTORY_LIMIT};
pub use profile::{ProfileStats, ProfileUpdate};
pub use progress::ChapterProgress;
pub use vocab::{Mastery, VocabItem};

use crate::clock::Clock;
use crate::error::{TierError, TierResult};
use crate::mirror::{self, LocalMirror};
use crate::remote::RemoteStore;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Callback receiving every absorbed storage failure
pub type ErrorSink = Arc<dyn Fn(&TierError) + Send + Sync>;

/// Work item for the background writer
enum Job {
    Write {
        table: &'static str,
        write: BoxFuture<'static, TierResult<()>>,
    },
    /// Answered once every earlier job has finished
    Flush(oneshot::Sender<()>),
}

/// Apply queued remote writes one at a time until every sender is gone
async fn run_writer(mut jobs: mpsc::UnboundedReceiver<Job>, sink: Option<ErrorSink>) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Write { table, write } => {
                if let Err(e) = write.await {
                    warn!("Background write to {} dropped: {}", table, e);
                    if let Some(sink) = &sink {
                        sink(&e);
                    }
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Keeps user records in the local mirror and the remote store
pub struct SyncOrchestrator {
    mirror: Arc<dyn LocalMirror>,
    remote: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    error_sink: Option<ErrorSink>,
    writer: Mutex<Option<mpsc::UnboundedSender<Job>>>,
}

impl SyncOrchestrator {
    pub fn new(
        mirror: Arc<dyn LocalMirror>,
        remote: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            mirror,
            remote,
            clock,
            error_sink: None,
            writer: Mutex::new(None),
        }
    }

    /// Report absorbed failures to `sink` as well as the log
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Wait for every background write queued so far
    pub async fn flush(&self) {
        let writer = self.lock_writer().clone();
        let Some(writer) = writer else {
            return;
        };

        let (done, finished) = oneshot::channel();
        if writer.send(Job::Flush(done)).is_err() {
            return;
        }
        debug!("Waiting for background writes");
        if finished.await.is_err() {
            warn!("Background writer stopped before draining its queue");
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Job>>> {
        self.writer.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn report(&self, err: &TierError) {
        if let Some(sink) = &self.error_sink {
            sink(err);
        }
    }

    fn read_local<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match mirror::read_json(self.mirror.as_ref(), key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Local read of {} failed: {}", key, e);
                None
            }
        }
    }

    fn write_local<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = mirror::write_json(self.mirror.as_ref(), key, value) {
            warn!("Local write of {} failed, continuing: {}", key, e);
            self.report(&e);
        }
    }

    fn remove_local(&self, key: &str) {
        if let Err(e) = self.mirror.remove(key) {
            warn!("Local removal of {} failed: {}", key, e);
            self.report(&e);
        }
    }

    /// One record from the remote store, or `None` if unreachable or unusable
    async fn remote_record<T: DeserializeOwned>(&self, table: &str, key: &str) -> Option<T> {
        if !self.remote.is_configured() {
            return None;
        }
        match self.remote.get(table, key).await {
            Ok(Some(record)) => match serde_json::from_value(record) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring malformed {} record {}: {}", table, key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!("Falling back to local {}: {}", table, e);
                None
            }
        }
    }

    /// Every record of a remote table, skipping malformed rows
    async fn remote_list<T: DeserializeOwned>(&self, table: &str) -> Option<Vec<T>> {
        if !self.remote.is_configured() {
            return None;
        }
        match self.remote.list(table).await {
            Ok(records) => Some(
                records
                    .into_iter()
                    .filter_map(|record| match serde_json::from_value(record) {
                        Ok(value) => Some(value),
                        Err(e) => {
                            warn!("Skipping malformed {} row: {}", table, e);
                            None
                        }
                    })
                    .collect(),
            ),
            Err(e) => {
                debug!("Falling back to local {}: {}", table, e);
                None
            }
        }
    }

    /// Upsert a record remotely without waiting for the result
    fn push_record<T: Serialize>(&self, table: &'static str, key: &str, value: &T) {
        if !self.remote.is_configured() {
            return;
        }

        let record = match serde_json::to_value(value) {
            Ok(record) => record,
            Err(e) => {
                let err = TierError::from(e);
                warn!("Could not encode {} record {}: {}", table, key, err);
                self.report(&err);
                return;
            }
        };

        let remote = Arc::clone(&self.remote);
        let key = key.to_string();
        self.spawn_remote(table, async move { remote.set(table, &key, &record).await });
    }

    fn spawn_remote<F>(&self, table: &'static str, write: F)
    where
        F: Future<Output = TierResult<()>> + Send + 'static,
    {
        let mut writer = self.lock_writer();
        if writer.as_ref().is_none_or(|tx| tx.is_closed()) {
            let Ok(runtime) = Handle::try_current() else {
                warn!("No async runtime, skipping remote write to {}", table);
                return;
            };
            let (tx, jobs) = mpsc::unbounded_channel();
            runtime.spawn(run_writer(jobs, self.error_sink.clone()));
            *writer = Some(tx);
        }

        let Some(tx) = writer.as_ref() else {
            return;
        };
        let job = Job::Write {
            table,
            write: write.boxed(),
        };
        if tx.send(job).is_err() {
            warn!("Background writer is gone, skipping remote write to {}", table);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::clock::ManualClock;
    use crate::mirror::MemoryMirror;
    use crate::remote::MemoryRemoteStore;
    use chrono::{TimeZone, Utc};

    pub struct Fixture {
        pub sync: SyncOrchestrator,
        pub mirror: Arc<MemoryMirror>,
        pub remote: Arc<MemoryRemoteStore>,
        pub clock: Arc<ManualClock>,
        pub errors: Arc<Mutex<Vec<String>>>,
    }

    pub fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        ));
        let mirror = Arc::new(MemoryMirror::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = errors.clone();
        let sync = SyncOrchestrator::new(mirror.clone(), remote.clone(), clock.clone())
            .with_error_sink(Arc::new(move |e: &TierError| {
                seen.lock().unwrap().push(e.to_string());
            }));
        Fixture {
            sync,
            mirror,
            remote,
            clock,
            errors,
        }
    }
}
