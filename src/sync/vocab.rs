//! Vocabulary vault
//!
//! Saving a term that is already in the vault counts as practice: the sync
//! counter goes up and mastery is promoted past fixed thresholds.

use super::SyncOrchestrator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use tracing::debug;

const VOCAB_KEY: &str = "vocab";
const VOCAB_TABLE: &str = "user_vocabulary";

/// Saves after which a term counts as being learned
const LEARNING_AFTER: u32 = 2;
/// Saves after which a term counts as mastered
const MASTERED_AFTER: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mastery {
    #[default]
    New,
    Learning,
    Mastered,
    Critical,
}

impl fmt::Display for Mastery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Mastered => "mastered",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

impl Mastery {
    /// Level reached after `sync_count` saves, never demoting below `current`
    fn after_saves(sync_count: u32, current: Mastery) -> Mastery {
        if sync_count > MASTERED_AFTER {
            Mastery::Mastered
        } else if sync_count > LEARNING_AFTER {
            Mastery::Learning
        } else {
            current
        }
    }
}

/// One saved term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabItem {
    pub term: String,
    pub translation: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub mastery: Mastery,
    #[serde(default)]
    pub sync_count: u32,
    #[serde(default)]
    pub last_practiced: Option<DateTime<Utc>>,
}

impl VocabItem {
    pub fn new(
        term: impl Into<String>,
        translation: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            term: term.into(),
            translation: translation.into(),
            kind: kind.into(),
            pronunciation: None,
            category: None,
            mastery: Mastery::New,
            sync_count: 0,
            last_practiced: None,
        }
    }
}

fn newest_first(items: &mut [VocabItem]) {
    items.sort_by_key(|item| Reverse(item.last_practiced));
}

impl SyncOrchestrator {
    /// Add a term to the vault, or count another practice of a known one
    pub fn save_vocab(&self, item: VocabItem) -> VocabItem {
        let mut vault: Vec<VocabItem> = self.read_local(VOCAB_KEY).unwrap_or_default();
        let now = self.clock.now();

        let saved = match vault.iter_mut().find(|v| v.term == item.term) {
            Some(existing) => {
                existing.sync_count += 1;
                existing.mastery = Mastery::after_saves(existing.sync_count, existing.mastery);
                existing.last_practiced = Some(now);
                existing.clone()
            }
            None => {
                let fresh = VocabItem {
                    mastery: Mastery::New,
                    sync_count: 1,
                    last_practiced: Some(now),
                    ..item
                };
                vault.push(fresh.clone());
                fresh
            }
        };

        self.write_local(VOCAB_KEY, &vault);
        self.push_record(VOCAB_TABLE, &saved.term, &saved);
        debug!("Saved {} ({}, {} saves)", saved.term, saved.mastery, saved.sync_count);
        saved
    }

    /// Set a term's mastery directly; `None` if the term is not in the vault
    pub fn update_vocab_mastery(&self, term: &str, mastery: Mastery) -> Option<VocabItem> {
        let mut vault: Vec<VocabItem> = self.read_local(VOCAB_KEY).unwrap_or_default();
        let item = vault.iter_mut().find(|v| v.term == term)?;
        item.mastery = mastery;
        item.last_practiced = Some(self.clock.now());
        let updated = item.clone();

        self.write_local(VOCAB_KEY, &vault);
        self.push_record(VOCAB_TABLE, &updated.term, &updated);
        Some(updated)
    }

    /// The whole vault, most recently practiced first
    pub async fn fetch_vocab(&self) -> Vec<VocabItem> {
        self.flush().await;

        let mut vault = match self.remote_list::<VocabItem>(VOCAB_TABLE).await {
            Some(remote) => {
                self.write_local(VOCAB_KEY, &remote);
                remote
            }
            None => self.read_local(VOCAB_KEY).unwrap_or_default(),
        };
        newest_first(&mut vault);
        vault
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::fixture;
    use chrono::Duration;

    fn gezellig() -> VocabItem {
        VocabItem::new("gezellig", "cozy", "adjective")
    }

    #[test]
    fn mastery_thresholds() {
        assert_eq!(Mastery::after_saves(2, Mastery::New), Mastery::New);
        assert_eq!(Mastery::after_saves(3, Mastery::New), Mastery::Learning);
        assert_eq!(Mastery::after_saves(5, Mastery::Learning), Mastery::Learning);
        assert_eq!(Mastery::after_saves(6, Mastery::Learning), Mastery::Mastered);
        assert_eq!(Mastery::after_saves(1, Mastery::Critical), Mastery::Critical);
    }

    #[tokio::test]
    async fn repeated_saves_promote_mastery() {
        let f = fixture();

        let first = f.sync.save_vocab(gezellig());
        assert_eq!(first.mastery, Mastery::New);
        assert_eq!(first.sync_count, 1);

        let mut last = first;
        for _ in 0..2 {
            last = f.sync.save_vocab(gezellig());
        }
        assert_eq!(last.sync_count, 3);
        assert_eq!(last.mastery, Mastery::Learning);

        for _ in 0..3 {
            last = f.sync.save_vocab(gezellig());
        }
        assert_eq!(last.sync_count, 6);
        assert_eq!(last.mastery, Mastery::Mastered);

        assert_eq!(f.sync.fetch_vocab().await.len(), 1);
    }

    #[tokio::test]
    async fn mastery_can_be_set_directly() {
        let f = fixture();
        f.sync.save_vocab(gezellig());

        let updated = f
            .sync
            .update_vocab_mastery("gezellig", Mastery::Critical)
            .unwrap();
        assert_eq!(updated.mastery, Mastery::Critical);
        assert!(f.sync.update_vocab_mastery("fiets", Mastery::New).is_none());

        f.sync.flush().await;
        let row = f.remote.peek("user_vocabulary", "gezellig").unwrap();
        assert_eq!(row["mastery"], "critical");
    }

    #[tokio::test]
    async fn vault_is_newest_first_offline() {
        let f = fixture();
        f.remote.set_reachable(false);

        f.sync.save_vocab(gezellig());
        f.clock.advance(Duration::minutes(5));
        f.sync.save_vocab(VocabItem::new("fiets", "bike", "noun"));

        let vault = f.sync.fetch_vocab().await;
        let terms: Vec<&str> = vault.iter().map(|v| v.term.as_str()).collect();
        assert_eq!(terms, vec!["fiets", "gezellig"]);
    }
}
