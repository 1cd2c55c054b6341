//! Profile stats

use super::SyncOrchestrator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROFILE_KEY: &str = "profile";
const PROFILE_TABLE: &str = "profiles";
const PROFILE_RECORD: &str = "stats";

/// Gamified counters for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileStats {
    pub points: u64,
    pub streak: u32,
    pub credits: u64,
    pub level: String,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Default for ProfileStats {
    fn default() -> Self {
        Self {
            points: 0,
            streak: 0,
            credits: 50,
            level: "A1".to_string(),
            last_activity: None,
        }
    }
}

/// Partial update; unset fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub points: Option<u64>,
    pub streak: Option<u32>,
    pub credits: Option<u64>,
    pub level: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.points.is_none()
            && self.streak.is_none()
            && self.credits.is_none()
            && self.level.is_none()
    }
}

impl ProfileStats {
    fn apply(&mut self, update: ProfileUpdate) {
        if let Some(points) = update.points {
            self.points = points;
        }
        if let Some(streak) = update.streak {
            self.streak = streak;
        }
        if let Some(credits) = update.credits {
            self.credits = credits;
        }
        if let Some(level) = update.level {
            self.level = level;
        }
    }
}

impl SyncOrchestrator {
    /// Merge `update` into the local profile and sync it in the background.
    ///
    /// Returns the merged record as written locally.
    pub fn persist(&self, update: ProfileUpdate) -> ProfileStats {
        let mut stats: ProfileStats = self.read_local(PROFILE_KEY).unwrap_or_default();
        stats.apply(update);
        stats.last_activity = Some(self.clock.now());

        self.write_local(PROFILE_KEY, &stats);
        self.push_record(PROFILE_TABLE, PROFILE_RECORD, &stats);
        debug!("Persisted profile: {} points", stats.points);
        stats
    }

    /// Remote profile if reachable, else the local copy, else defaults
    pub async fn fetch_profile_stats(&self) -> ProfileStats {
        self.flush().await;

        if let Some(stats) = self
            .remote_record::<ProfileStats>(PROFILE_TABLE, PROFILE_RECORD)
            .await
        {
            self.write_local(PROFILE_KEY, &stats);
            return stats;
        }

        self.read_local(PROFILE_KEY).unwrap_or_default()
    }
}
