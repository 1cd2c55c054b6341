//! Completed chapters

use super::{ProfileStats, ProfileUpdate, SyncOrchestrator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

const PROGRESS_KEY: &str = "progress";
const PROGRESS_TABLE: &str = "user_progress";

/// Remote row for one completed chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterProgress {
    pub chapter_id: String,
    #[serde(default = "full_score")]
    pub score: u32,
    pub completed_at: DateTime<Utc>,
}

fn full_score() -> u32 {
    100
}

impl SyncOrchestrator {
    /// Mark a chapter complete; returns false if it already was
    pub fn save_chapter_progress(&self, chapter_id: &str) -> bool {
        let mut completed: Vec<String> = self.read_local(PROGRESS_KEY).unwrap_or_default();
        let added = !completed.iter().any(|id| id == chapter_id);
        if added {
            completed.push(chapter_id.to_string());
            self.write_local(PROGRESS_KEY, &completed);
        }

        let record = ChapterProgress {
            chapter_id: chapter_id.to_string(),
            score: full_score(),
            completed_at: self.clock.now(),
        };
        self.push_record(PROGRESS_TABLE, chapter_id, &record);
        added
    }

    /// Completed chapter ids, remote first
    pub async fn fetch_progress(&self) -> Vec<String> {
        self.flush().await;

        if let Some(rows) = self.remote_list::<ChapterProgress>(PROGRESS_TABLE).await {
            let ids: Vec<String> = rows.into_iter().map(|row| row.chapter_id).collect();
            self.write_local(PROGRESS_KEY, &ids);
            return ids;
        }

        self.read_local(PROGRESS_KEY).unwrap_or_default()
    }

    /// Record a finished chapter and award its points.
    ///
    /// The progress row and the profile update are synced concurrently.
    pub async fn complete_turn(&self, chapter_id: &str, points_earned: u64) -> ProfileStats {
        let current = self.fetch_profile_stats().await;

        self.save_chapter_progress(chapter_id);
        let stats = self.persist(ProfileUpdate {
            points: Some(current.points.saturating_add(points_earned)),
            ..Default::default()
        });

        info!(
            "Completed {} (+{} points, {} total)",
            chapter_id, points_earned, stats.points
        );
        stats
    }
}
