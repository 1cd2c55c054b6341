//! tiercache - offline-first tiered content cache
//!
//! Generated content is looked up in a local mirror, then a remote store,
//! and only produced (under a per-class cooldown) when both miss. User
//! records sync the same way: local first, remote in the background.

pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod mirror;
pub mod producer;
pub mod remote;
pub mod resolver;
pub mod sink;
pub mod sync;
pub mod throttle;

pub use error::{ResolveError, TierError, TierResult};
