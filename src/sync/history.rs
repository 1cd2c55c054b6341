//! Activity history and streaks

use super::SyncOrchestrator;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{info, warn};

const HISTORY_KEY: &str = "history";
const HISTORY_TABLE: &str = "history";

/// Items kept in the local history
pub const HISTORY_LIMIT: usize = 50;

/// Feature that produced a history item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Roadmap,
    #[default]
    AiSync,
    News,
    Civic,
    Roleplay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub topic: String,
    pub level: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: SyncSource,
}

impl SyncOrchestrator {
    /// Prepend an item to the local history and sync it
    pub fn save_history(&self, item: HistoryItem) {
        let mut history: Vec<HistoryItem> = self.read_local(HISTORY_KEY).unwrap_or_default();
        history.retain(|existing| existing.id != item.id);
        history.insert(0, item.clone());
        history.truncate(HISTORY_LIMIT);

        self.write_local(HISTORY_KEY, &history);
        self.push_record(HISTORY_TABLE, &item.id, &item);
    }

    /// Full history, newest first; the local copy keeps the latest items only
    pub async fn fetch_history(&self) -> Vec<HistoryItem> {
        self.flush().await;

        match self.remote_list::<HistoryItem>(HISTORY_TABLE).await {
            Some(mut remote) => {
                remote.sort_by_key(|item| Reverse(item.timestamp));
                let keep = remote.len().min(HISTORY_LIMIT);
                self.write_local(HISTORY_KEY, &remote[..keep]);
                remote
            }
            None => self.read_local(HISTORY_KEY).unwrap_or_default(),
        }
    }

    /// Drop every history item locally and remotely.
    ///
    /// Returns whether the remote purge went through.
    pub async fn clear_history(&self) -> bool {
        self.flush().await;
        self.remove_local(HISTORY_KEY);
        if !self.remote.is_configured() {
            return false;
        }

        match self.remote.delete_owner(HISTORY_TABLE).await {
            Ok(()) => {
                info!("Cleared history");
                true
            }
            Err(e) => {
                warn!("Remote history purge failed: {}", e);
                self.report(&e);
                false
            }
        }
    }

    /// Consecutive active days in the local history, ending today or yesterday
    pub fn calculate_streak(&self, today: NaiveDate) -> u32 {
        let history: Vec<HistoryItem> = self.read_local(HISTORY_KEY).unwrap_or_default();
        streak_from_dates(history.iter().map(|item| item.timestamp.date_naive()), today)
    }
}

/// Length of the run of consecutive days that ends today or yesterday
pub fn streak_from_dates(dates: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = dates.into_iter().filter(|d| *d <= today).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&latest) = days.first() else {
        return 0;
    };
    if (today - latest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    for pair in days.windows(2) {
        if (pair[0] - pair[1]).num_days() != 1 {
            break;
        }
        streak += 1;
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::sync::testing::fixture;
    use chrono::{Duration, TimeZone};

    fn item(id: &str, timestamp: DateTime<Utc>) -> HistoryItem {
        HistoryItem {
            id: id.to_string(),
            topic: "Bij de bakker".to_string(),
            level: "A1".to_string(),
            content: "Goedemorgen".to_string(),
            timestamp,
            source: SyncSource::Roadmap,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn streak_rules() {
        assert_eq!(streak_from_dates(Vec::new(), day(14)), 0);
        assert_eq!(streak_from_dates(vec![day(14)], day(14)), 1);
        assert_eq!(streak_from_dates(vec![day(13)], day(14)), 1);
        assert_eq!(streak_from_dates(vec![day(12)], day(14)), 0);
        assert_eq!(
            streak_from_dates(vec![day(14), day(13), day(13), day(12), day(10)], day(14)),
            3
        );
        assert_eq!(streak_from_dates(vec![day(11), day(13), day(12)], day(14)), 3);
    }

    #[tokio::test]
    async fn local_history_is_capped_newest_first() {
        let f = fixture();
        f.remote.set_reachable(false);
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();

        for i in 0..(HISTORY_LIMIT + 5) {
            let at = start + Duration::minutes(i as i64);
            f.sync.save_history(item(&format!("h{}", i), at));
        }

        let history = f.sync.fetch_history().await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].id, format!("h{}", HISTORY_LIMIT + 4));
    }

    #[tokio::test]
    async fn streak_uses_local_history() {
        let f = fixture();
        let now = f.clock.now();
        f.sync.save_history(item("a", now - Duration::days(2)));
        f.sync.save_history(item("b", now - Duration::days(1)));
        f.sync.save_history(item("c", now));

        assert_eq!(f.sync.calculate_streak(now.date_naive()), 3);
        assert_eq!(
            f.sync.calculate_streak(now.date_naive() + Duration::days(2)),
            0
        );
    }

    #[tokio::test]
    async fn clear_history_purges_both_tiers() {
        let f = fixture();
        f.sync.save_history(item("a", f.clock.now()));
        f.sync.flush().await;
        assert!(f.remote.peek("history", "a").is_some());

        assert!(f.sync.clear_history().await);
        assert!(f.remote.peek("history", "a").is_none());
        assert!(f.sync.fetch_history().await.is_empty());
    }

    #[tokio::test]
    async fn clear_history_offline_still_clears_locally() {
        let f = fixture();
        f.sync.save_history(item("a", f.clock.now()));
        f.remote.set_reachable(false);

        assert!(!f.sync.clear_history().await);
        assert!(f.sync.fetch_history().await.is_empty());
    }
}
