//! Configuration schema for tiercache
//!
//! Configuration is stored at `~/.config/tiercache/config.toml`

use crate::content::LISTING_TTL_MINUTES;
use crate::producer::DEFAULT_PRODUCER_TIMEOUT_SECS;
use crate::throttle::DEFAULT_COOLDOWN_SECS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Local mirror settings
    pub mirror: MirrorConfig,

    /// Remote store settings
    pub remote: RemoteConfig,

    /// Producer cooldowns
    pub throttle: ThrottleConfig,

    /// Content producer command
    pub producer: ProducerConfig,

    /// Listing freshness
    pub listing: ListingConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record dropped background writes to the event log
    pub event_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            event_log: true,
        }
    }
}

/// Local mirror configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Directory for mirror entries (default: state dir)
    pub dir: Option<PathBuf>,
}

/// Remote store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the REST endpoint; unset means local-only
    pub url: Option<String>,

    /// API key sent as `apikey` and bearer token
    pub api_key: Option<String>,

    /// Owner whose rows are read and written
    pub owner_id: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            owner_id: "local-user".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Cooldown applied to every resource class
    pub cooldown_secs: u64,

    /// Per-class cooldowns in seconds
    pub overrides: HashMap<String, u64>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            overrides: HashMap::new(),
        }
    }
}

/// Producer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Generator argv; `{key}` is replaced with the content key
    pub command: Vec<String>,

    /// Deadline for one production
    pub timeout_secs: u64,

    /// Cooldown class charged per production
    pub resource_class: Option<String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: DEFAULT_PRODUCER_TIMEOUT_SECS,
            resource_class: None,
        }
    }
}

/// Listing cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Minutes a listing stays servable
    pub ttl_minutes: i64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: LISTING_TTL_MINUTES,
        }
    }
}

impl ListingConfig {
    /// Freshness window, `None` if negative or too large to represent
    pub fn ttl(&self) -> Option<chrono::Duration> {
        if self.ttl_minutes < 0 {
            return None;
        }
        chrono::Duration::try_minutes(self.ttl_minutes)
    }
}

impl Config {
    /// Reject values that parse but cannot be used
    pub fn validate(&self) -> Result<(), String> {
        if self.listing.ttl().is_none() {
            return Err(format!(
                "listing.ttl_minutes = {} is out of range",
                self.listing.ttl_minutes
            ));
        }
        Ok(())
    }
}
