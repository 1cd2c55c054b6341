//! PostgREST-compatible remote store
//!
//! Talks to the REST surface that hosted Postgres backends expose. Every
//! table used here has the shape:
//!
//! | Column | Type |
//! |--------|------|
//! | `owner_id` | text |
//! | `key` | text |
//! | `record` | jsonb |
//! | `updated_at` | timestamptz |
//!
//! with a unique constraint on `(owner_id, key)` so that upserts merge.
//! Requests run on the blocking pool because `ureq` is synchronous.

use super::RemoteStore;
use crate::error::{TierError, TierResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::fmt::Display;
use std::time::Duration;
use tracing::debug;

/// Remote store speaking the PostgREST dialect
#[derive(Clone)]
pub struct RestRemoteStore {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    owner_id: String,
}

impl RestRemoteStore {
    /// Create a store for `owner_id` against `base_url`
    pub fn new(base_url: &str, api_key: String, owner_id: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            owner_id: owner_id.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn owner_filter(&self) -> String {
        format!("eq.{}", self.owner_id)
    }

    /// Run a blocking request off the async executor
    async fn blocking<T, F>(&self, op: F) -> TierResult<T>
    where
        T: Send + 'static,
        F: FnOnce(RestRemoteStore) -> TierResult<T> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || op(this))
            .await
            .map_err(|e| TierError::Internal(format!("remote request task failed: {}", e)))?
    }

    fn rows(body: &str) -> TierResult<Vec<Value>> {
        let rows: Vec<Value> = serde_json::from_str(body).map_err(unavailable)?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.get_mut("record").map(Value::take))
            .collect())
    }
}

fn unavailable(e: impl Display) -> TierError {
    TierError::RemoteStoreUnavailable(e.to_string())
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn get(&self, table: &str, key: &str) -> TierResult<Option<Value>> {
        let table = table.to_string();
        let key = key.to_string();
        self.blocking(move |this| {
            let mut response = this
                .agent
                .get(&this.table_url(&table))
                .header("apikey", &this.api_key)
                .header("Authorization", format!("Bearer {}", this.api_key))
                .query("owner_id", this.owner_filter())
                .query("key", format!("eq.{}", key))
                .query("select", "record")
                .query("limit", "1")
                .call()
                .map_err(unavailable)?;

            let body = response.body_mut().read_to_string().map_err(unavailable)?;
            let record = Self::rows(&body)?.into_iter().next();
            debug!("Remote get {}/{}: {}", table, key, record.is_some());
            Ok(record)
        })
        .await
    }

    async fn set(&self, table: &str, key: &str, record: &Value) -> TierResult<()> {
        let table = table.to_string();
        let body = serde_json::to_string(&json!({
            "owner_id": self.owner_id,
            "key": key,
            "record": record,
            "updated_at": Utc::now().to_rfc3339(),
        }))?;

        self.blocking(move |this| {
            this.agent
                .post(&this.table_url(&table))
                .header("apikey", &this.api_key)
                .header("Authorization", format!("Bearer {}", this.api_key))
                .header("Content-Type", "application/json")
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .query("on_conflict", "owner_id,key")
                .send(body)
                .map_err(unavailable)?;
            Ok(())
        })
        .await
    }

    async fn list(&self, table: &str) -> TierResult<Vec<Value>> {
        let table = table.to_string();
        self.blocking(move |this| {
            let mut response = this
                .agent
                .get(&this.table_url(&table))
                .header("apikey", &this.api_key)
                .header("Authorization", format!("Bearer {}", this.api_key))
                .query("owner_id", this.owner_filter())
                .query("select", "record")
                .query("order", "updated_at.desc")
                .call()
                .map_err(unavailable)?;

            let body = response.body_mut().read_to_string().map_err(unavailable)?;
            Self::rows(&body)
        })
        .await
    }

    async fn delete_owner(&self, table: &str) -> TierResult<()> {
        let table = table.to_string();
        self.blocking(move |this| {
            this.agent
                .delete(&this.table_url(&table))
                .header("apikey", &this.api_key)
                .header("Authorization", format!("Bearer {}", this.api_key))
                .query("owner_id", this.owner_filter())
                .call()
                .map_err(unavailable)?;
            debug!("Deleted all {} rows for owner {}", table, this.owner_id);
            Ok(())
        })
        .await
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RestRemoteStore {
        RestRemoteStore::new(
            "https://db.example.com/",
            "anon".to_string(),
            "user-1",
            Duration::from_secs(1),
        )
    }

    #[test]
    fn builds_table_urls() {
        let store = store();
        assert_eq!(
            store.table_url("content_cache"),
            "https://db.example.com/rest/v1/content_cache"
        );
        assert_eq!(store.owner_filter(), "eq.user-1");
    }

    #[test]
    fn rows_extracts_records() {
        let rows = RestRemoteStore::rows(r#"[{"record": {"a": 1}}, {"other": 2}]"#).unwrap();
        assert_eq!(rows, vec![json!({"a": 1})]);
        assert!(RestRemoteStore::rows("<html>").is_err());
    }

    #[tokio::test]
    async fn unreachable_host_is_reported_not_raised() {
        let store = RestRemoteStore::new(
            "http://127.0.0.1:9",
            String::new(),
            "user-1",
            Duration::from_millis(500),
        );
        let result = store.get("content_cache", "LESSON-1").await;
        assert!(matches!(result, Err(TierError::RemoteStoreUnavailable(_))));
    }
}
