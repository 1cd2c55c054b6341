//! Remote durable store
//!
//! Network-accessed table store, authoritative when reachable. Every
//! operation reports failure through its `Result`; callers in this crate
//! absorb those failures (see `RemoteStoreUnavailable`) instead of letting
//! them reach the user.

pub mod memory;
pub mod rest;

pub use memory::MemoryRemoteStore;
pub use rest::RestRemoteStore;

use crate::config::schema::RemoteConfig;
use crate::error::{TierError, TierResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Abstract remote table store, scoped to a single owner
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one record
    async fn get(&self, table: &str, key: &str) -> TierResult<Option<Value>>;

    /// Insert or replace one record
    async fn set(&self, table: &str, key: &str, record: &Value) -> TierResult<()>;

    /// List every record of the owner in a table
    async fn list(&self, table: &str) -> TierResult<Vec<Value>>;

    /// Delete every row this owner has in a table
    async fn delete_owner(&self, table: &str) -> TierResult<()>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;

    /// False for the local-only stand-in; callers skip remote work entirely
    fn is_configured(&self) -> bool {
        true
    }
}

/// Stand-in used when no remote is configured; every call fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableRemote;

impl UnreachableRemote {
    fn err() -> TierError {
        TierError::RemoteStoreUnavailable("no remote store configured".to_string())
    }
}

#[async_trait]
impl RemoteStore for UnreachableRemote {
    async fn get(&self, _table: &str, _key: &str) -> TierResult<Option<Value>> {
        Err(Self::err())
    }

    async fn set(&self, _table: &str, _key: &str, _record: &Value) -> TierResult<()> {
        Err(Self::err())
    }

    async fn list(&self, _table: &str) -> TierResult<Vec<Value>> {
        Err(Self::err())
    }

    async fn delete_owner(&self, _table: &str) -> TierResult<()> {
        Err(Self::err())
    }

    fn name(&self) -> &'static str {
        "unreachable"
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Build the remote store described by the configuration
pub fn create_remote(config: &RemoteConfig) -> Arc<dyn RemoteStore> {
    match config.url.as_deref() {
        Some(url) if !url.trim().is_empty() => Arc::new(RestRemoteStore::new(
            url,
            config.api_key.clone().unwrap_or_default(),
            &config.owner_id,
            Duration::from_secs(config.timeout_secs),
        )),
        _ => {
            tracing::debug!("No remote URL configured, running local-only");
            Arc::new(UnreachableRemote)
        }
    }
}
