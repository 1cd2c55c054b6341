//! Throttle guard for expensive producer calls
//!
//! A fixed cooldown window per resource class: once a class has produced
//! something, further productions of that class are refused until the
//! window has passed. Keys do not matter, only the class.
//!
//! State is process-local and starts empty on every run.

use crate::clock::Clock;
use crate::error::ResolveError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Default cooldown between productions of one class
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Named category of expensive operation sharing one cooldown timer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceClass(String);

impl ResourceClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Search-backed content (news listings)
    pub fn news_search() -> Self {
        Self::new("news_search")
    }

    /// Civic and legal lookups
    pub fn civic_search() -> Self {
        Self::new("civic_search")
    }

    /// Roleplay turn engine
    pub fn roleplay_engine() -> Self {
        Self::new("roleplay_engine")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last successful execution of one class
#[derive(Debug, Clone, Copy)]
struct ThrottleState {
    last_execution_at: DateTime<Utc>,
}

/// Per-class fixed-window limiter
pub struct ThrottleGuard {
    clock: Arc<dyn Clock>,
    default_window: Duration,
    overrides: HashMap<ResourceClass, Duration>,
    state: Mutex<HashMap<ResourceClass, ThrottleState>>,
}

impl ThrottleGuard {
    /// Create a guard with `default_window` applied to every class
    pub fn new(clock: Arc<dyn Clock>, default_window: std::time::Duration) -> Self {
        Self {
            clock,
            default_window: to_chrono(default_window),
            overrides: HashMap::new(),
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different window for one class
    pub fn with_override(mut self, class: ResourceClass, window: std::time::Duration) -> Self {
        self.overrides.insert(class, to_chrono(window));
        self
    }

    /// Cooldown window that applies to `class`
    pub fn window(&self, class: &ResourceClass) -> Duration {
        self.overrides
            .get(class)
            .copied()
            .unwrap_or(self.default_window)
    }

    /// Whether `class` is still cooling down
    pub fn is_throttled(&self, class: &ResourceClass) -> bool {
        match self.elapsed(class) {
            Some(elapsed) => elapsed < self.window(class),
            None => false,
        }
    }

    /// Whole seconds left in the cooldown, rounded up, never negative
    pub fn remaining_seconds(&self, class: &ResourceClass) -> u64 {
        let Some(elapsed) = self.elapsed(class) else {
            return 0;
        };

        let window = self.window(class);
        let remaining_ms = window
            .checked_sub(&elapsed)
            .unwrap_or(window)
            .num_milliseconds()
            .min(window.num_milliseconds());
        if remaining_ms <= 0 {
            return 0;
        }
        (remaining_ms as u64).div_ceil(1000)
    }

    /// Start a new cooldown for `class`
    pub fn record_execution(&self, class: &ResourceClass) {
        let now = self.clock.now();
        self.lock().insert(
            class.clone(),
            ThrottleState {
                last_execution_at: now,
            },
        );
        debug!("Recorded execution of {} at {}", class, now);
    }

    /// Refuse with `Throttled` while `class` is cooling down
    pub fn check(&self, class: &ResourceClass) -> Result<(), ResolveError> {
        if self.is_throttled(class) {
            let remaining = self.remaining_seconds(class);
            debug!("{} throttled for another {}s", class, remaining);
            return Err(ResolveError::throttled(class.as_str(), remaining));
        }
        Ok(())
    }

    fn elapsed(&self, class: &ResourceClass) -> Option<Duration> {
        let last = self.lock().get(class).map(|s| s.last_execution_at)?;
        Some(self.clock.now() - last)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceClass, ThrottleState>> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn to_chrono(window: std::time::Duration) -> Duration {
    Duration::from_std(window).unwrap_or(Duration::MAX)
}
