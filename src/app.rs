//! Builds the cache stack described by the configuration

use crate::clock::{Clock, SystemClock};
use crate::config::schema::{ProducerConfig, ThrottleConfig};
use crate::config::{Config, ConfigManager};
use crate::content::{ContentClass, ContentKey};
use crate::error::{ResolveError, TierError, TierResult};
use crate::mirror::{FileMirror, LocalMirror};
use crate::producer::{CommandProducer, Producer, ProducerInvoker, ProducerOutput};
use crate::remote::{create_remote, RemoteStore};
use crate::resolver::CacheResolver;
use crate::sink::EventLog;
use crate::sync::SyncOrchestrator;
use crate::throttle::{ResourceClass, ThrottleGuard};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything a command needs, wired from one [`Config`]
pub struct App {
    pub resolver: CacheResolver,
    pub sync: SyncOrchestrator,
    pub events: EventLog,
    producer: Option<Arc<CommandProducer>>,
    listing_ttl: chrono::Duration,
}

impl App {
    /// Open the mirror, pick the remote backend and build the stack
    pub fn from_config(config: &Config) -> TierResult<Self> {
        let listing_ttl = config.listing.ttl().ok_or_else(|| TierError::ConfigInvalid {
            path: PathBuf::from("[listing].ttl_minutes"),
            reason: format!("{} minutes is out of range", config.listing.ttl_minutes),
        })?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mirror: Arc<dyn LocalMirror> =
            Arc::new(FileMirror::open(ConfigManager::mirror_dir(config))?);
        let remote: Arc<dyn RemoteStore> = create_remote(&config.remote);
        debug!("Remote backend: {}", remote.name());

        let events = EventLog::from_config(config);
        let throttle = Arc::new(create_throttle(&config.throttle, clock.clone()));
        let invoker = ProducerInvoker::new(Duration::from_secs(config.producer.timeout_secs));

        let resolver = CacheResolver::new(
            mirror.clone(),
            remote.clone(),
            throttle,
            invoker,
            clock.clone(),
        );
        let sync =
            SyncOrchestrator::new(mirror, remote, clock).with_error_sink(events.error_sink());

        Ok(Self {
            resolver,
            sync,
            events,
            producer: create_producer(&config.producer).map(Arc::new),
            listing_ttl,
        })
    }

    /// The configured producer command, or one that always fails
    pub fn producer(&self) -> Arc<dyn Producer> {
        match &self.producer {
            Some(producer) => producer.clone() as Arc<dyn Producer>,
            None => Arc::new(NoProducer),
        }
    }

    pub fn has_producer(&self) -> bool {
        self.producer.is_some()
    }

    /// Content class for a lesson or a listing lookup
    pub fn content_class(&self, listing: bool) -> ContentClass {
        if listing {
            ContentClass::Listing {
                ttl: self.listing_ttl,
            }
        } else {
            ContentClass::Lesson
        }
    }
}

/// Stand-in when no producer command is configured; cache hits still work
struct NoProducer;

#[async_trait]
impl Producer for NoProducer {
    async fn generate(&self, _key: &ContentKey) -> Result<ProducerOutput, ResolveError> {
        Err(ResolveError::network("no producer command configured"))
    }
}

/// Throttle guard with the configured default and per-class windows
pub fn create_throttle(config: &ThrottleConfig, clock: Arc<dyn Clock>) -> ThrottleGuard {
    let mut guard = ThrottleGuard::new(clock, Duration::from_secs(config.cooldown_secs));
    for (class, secs) in &config.overrides {
        guard = guard.with_override(ResourceClass::new(class), Duration::from_secs(*secs));
    }
    guard
}

/// Producer command, if one is configured
pub fn create_producer(config: &ProducerConfig) -> Option<CommandProducer> {
    let producer = CommandProducer::new(config.command.clone())?;
    Some(producer.with_resource_class(config.resource_class.as_deref().map(ResourceClass::new)))
}
