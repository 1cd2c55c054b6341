//! Event log for absorbed failures and cache activity
//!
//! Writes JSON lines to `~/.local/state/tiercache/events.log`. Logging is
//! best-effort: an event that cannot be written is dropped with a warning.

use crate::config::{schema::Config, ConfigManager};
use crate::error::TierError;
use crate::sync::ErrorSink;
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based event logger that appends JSON lines
#[derive(Debug, Clone)]
pub struct EventLog {
    enabled: bool,
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: PathBuf, enabled: bool) -> Self {
        Self { enabled, path }
    }

    /// Create an event logger from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(ConfigManager::event_log_path(), config.general.event_log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log an event as a JSON line
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        let Some(line) = self.line(event, data) else {
            return;
        };

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write event log: {}", e);
        }
    }

    /// Error sink that records every absorbed storage failure
    pub fn error_sink(&self) -> ErrorSink {
        let log = self.clone();
        Arc::new(move |err: &TierError| {
            let data = serde_json::json!({ "error": err.to_string() });
            let Some(line) = log.line("storage.write_dropped", &data) else {
                return;
            };
            if let Err(e) = log.append_blocking(&line) {
                warn!("Failed to write event log: {}", e);
            }
        })
    }

    fn line(&self, event: &str, data: &serde_json::Value) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        match serde_json::to_string(&entry) {
            Ok(mut line) => {
                line.push('\n');
                Some(line)
            }
            Err(e) => {
                warn!("Failed to serialize event: {}", e);
                None
            }
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    fn append_blocking(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}
