//! Producer invocation
//!
//! A producer is whatever expensive generator sits behind the cache (an AI
//! text model, a search-backed lookup, an external command). It either hands
//! back a finished [`Artifact`] or a finite, non-restartable stream of text
//! chunks. [`ProducerInvoker`] turns both shapes into one artifact:
//!
//! - streamed chunks are accumulated; the artifact only exists once the
//!   stream has ended cleanly
//! - a mid-stream error discards the partial buffer
//! - the whole production runs under one deadline
//! - registered [`Deriver`]s then run concurrently over the finished body

pub mod command;

pub use command::CommandProducer;

use crate::content::{Artifact, ContentKey};
use crate::error::{ProducerFailure, ResolveError};
use crate::throttle::ResourceClass;
use async_trait::async_trait;
use futures_util::future::join_all;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default deadline for one production
pub const DEFAULT_PRODUCER_TIMEOUT_SECS: u64 = 60;

/// Incremental text fragment from a streaming producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Finite stream of chunks; end of stream is the end of the content
pub type ChunkStream = BoxStream<'static, Result<Chunk, ResolveError>>;

/// Callback receiving each chunk as it arrives
pub type ChunkCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// What a producer hands back
pub enum ProducerOutput {
    Complete(Artifact),
    Stream(ChunkStream),
}

/// Expensive content generator consulted on a full cache miss
#[async_trait]
pub trait Producer: Send + Sync {
    /// Cooldown class charged for each production, if any
    fn resource_class(&self) -> Option<ResourceClass> {
        None
    }

    /// Start producing content for `key`
    async fn generate(&self, key: &ContentKey) -> Result<ProducerOutput, ResolveError>;
}

/// Secondary data extracted from a finished body (vocabulary, quiz, ...)
#[async_trait]
pub trait Deriver: Send + Sync {
    /// Field name under which the result is stored
    fn name(&self) -> &str;

    async fn derive(&self, primary: &str) -> Result<serde_json::Value, ResolveError>;
}

/// Runs producers under a deadline and normalizes their output
#[derive(Clone)]
pub struct ProducerInvoker {
    timeout: Duration,
    derivers: Vec<Arc<dyn Deriver>>,
}

impl Default for ProducerInvoker {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PRODUCER_TIMEOUT_SECS))
    }
}

impl ProducerInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            derivers: Vec::new(),
        }
    }

    /// Add a deriver run after every successful production
    pub fn with_deriver(mut self, deriver: Arc<dyn Deriver>) -> Self {
        self.derivers.push(deriver);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Produce one artifact for `key`
    pub async fn invoke(
        &self,
        producer: &dyn Producer,
        key: &ContentKey,
        on_chunk: Option<&ChunkCallback>,
    ) -> Result<Artifact, ResolveError> {
        let work = async {
            let artifact = match producer.generate(key).await? {
                ProducerOutput::Complete(artifact) => artifact,
                ProducerOutput::Stream(stream) => {
                    Artifact::new(collect_stream(stream, on_chunk).await?)
                }
            };

            if artifact.body.trim().is_empty() {
                return Err(ResolveError::malformed(format!(
                    "producer returned an empty body for {}",
                    key
                )));
            }

            self.derive(artifact).await
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => {
                if result.is_ok() {
                    info!("Produced content for {}", key);
                }
                result
            }
            Err(_) => {
                warn!("Production of {} timed out after {:?}", key, self.timeout);
                Err(ResolveError::producer(
                    ProducerFailure::Timeout,
                    format!("no result within {}s", self.timeout.as_secs()),
                ))
            }
        }
    }

    /// Fan out every deriver over the finished body
    async fn derive(&self, mut artifact: Artifact) -> Result<Artifact, ResolveError> {
        if self.derivers.is_empty() {
            return Ok(artifact);
        }

        let body = artifact.body.as_str();
        let results = join_all(self.derivers.iter().map(|d| d.derive(body))).await;

        let mut derived = Vec::with_capacity(results.len());
        for (deriver, result) in self.derivers.iter().zip(results) {
            derived.push((deriver.name().to_string(), result?));
        }

        debug!("Attached {} derived field(s)", derived.len());
        artifact.derived.extend(derived);
        Ok(artifact)
    }
}

/// Accumulate a chunk stream; any error discards everything read so far
async fn collect_stream(
    mut stream: ChunkStream,
    on_chunk: Option<&ChunkCallback>,
) -> Result<String, ResolveError> {
    let mut buffer = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(callback) = on_chunk {
            callback(&chunk.text);
        }
        buffer.push_str(&chunk.text);
    }
    Ok(buffer)
}
