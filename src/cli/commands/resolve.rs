//! Resolve command - fetch content through the cache tiers

use crate::app::App;
use crate::cli::args::ResolveArgs;
use crate::config::Config;
use crate::content::{Artifact, ContentKey};
use crate::error::{ResolveError, TierError, TierResult};
use crate::producer::ChunkCallback;
use crate::sync::{HistoryItem, SyncSource};
use chrono::Utc;
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> TierResult<()> {
    let app = App::from_config(config)?;
    let key = ContentKey::new(args.key)?;
    let class = app.content_class(args.listing);

    let streamed = Arc::new(AtomicBool::new(false));
    let on_chunk = (!args.quiet).then(|| stream_to_stdout(streamed.clone()));

    let result = app
        .resolver
        .resolve_with_progress(&key, class, app.producer(), on_chunk)
        .await;
    debug!("Resolver stats: {:?}", app.resolver.stats());

    let artifact = match result {
        Ok(artifact) => artifact,
        Err(e) => {
            app.events
                .log(
                    "content.failed",
                    &json!({ "key": key.as_str(), "error": e.to_string() }),
                )
                .await;
            return Err(map_failure(e, app.has_producer()));
        }
    };

    if streamed.load(Ordering::SeqCst) {
        if !artifact.body.ends_with('\n') {
            println!();
        }
    } else {
        print_body(&artifact);
    }

    app.events
        .log(
            "content.resolved",
            &json!({ "key": key.as_str(), "table": class.table() }),
        )
        .await;

    if !args.listing && !args.no_history {
        record_history(&app, &key, &artifact).await;
    }

    Ok(())
}

/// Without a producer command, any production failure means "configure one"
fn map_failure(err: ResolveError, has_producer: bool) -> TierError {
    match err {
        ResolveError::ProducerUnavailable { .. } if !has_producer => {
            TierError::ProducerNotConfigured
        }
        other => TierError::Resolve(other),
    }
}

fn stream_to_stdout(streamed: Arc<AtomicBool>) -> ChunkCallback {
    Arc::new(move |text: &str| {
        streamed.store(true, Ordering::SeqCst);
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes()).ok();
        stdout.flush().ok();
    })
}

fn print_body(artifact: &Artifact) {
    if artifact.body.ends_with('\n') {
        print!("{}", artifact.body);
    } else {
        println!("{}", artifact.body);
    }
}

async fn record_history(app: &App, key: &ContentKey, artifact: &Artifact) {
    let level = app.sync.fetch_profile_stats().await.level;
    app.sync.save_history(HistoryItem {
        id: uuid::Uuid::new_v4().to_string(),
        topic: key.to_string(),
        level,
        content: artifact.body.clone(),
        timestamp: Utc::now(),
        source: SyncSource::AiSync,
    });
    app.sync.flush().await;
    debug!("Saved {} to history", key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_producer_becomes_config_error() {
        let err = map_failure(ResolveError::network("no producer"), false);
        assert!(matches!(err, TierError::ProducerNotConfigured));

        let err = map_failure(ResolveError::network("reset"), true);
        assert!(matches!(err, TierError::Resolve(_)));

        let err = map_failure(ResolveError::throttled("news_search", 4), false);
        assert!(matches!(
            err,
            TierError::Resolve(ResolveError::Throttled { .. })
        ));
    }
}
