//! External command producer
//!
//! Runs a configured generator command and streams its stdout, line by
//! line, as chunks. `{key}` anywhere in the argv is replaced with the
//! content key. Exit status decides the failure kind:
//!
//! | Exit | Result |
//! |------|--------|
//! | 0 | stream ends, content complete |
//! | 75 (EX_TEMPFAIL) | `Quota` |
//! | anything else | `Network` |
//!
//! The child is killed if the stream is dropped before it finishes.

use super::{Chunk, Producer, ProducerOutput};
use crate::content::ContentKey;
use crate::error::{ProducerFailure, ResolveError};
use crate::throttle::ResourceClass;
use async_trait::async_trait;
use futures_util::stream;
use futures_util::StreamExt;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

/// Exit code a generator uses to report quota exhaustion
pub const EXIT_TEMPFAIL: i32 = 75;

/// Producer backed by an external command
#[derive(Debug, Clone)]
pub struct CommandProducer {
    argv: Vec<String>,
    resource_class: Option<ResourceClass>,
}

impl CommandProducer {
    /// Create a producer from a non-empty argv
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.first().is_none_or(|program| program.trim().is_empty()) {
            return None;
        }
        Some(Self {
            argv,
            resource_class: None,
        })
    }

    /// Charge productions to a cooldown class
    pub fn with_resource_class(mut self, class: Option<ResourceClass>) -> Self {
        self.resource_class = class;
        self
    }

    /// Argv with the key substituted
    fn command_line(&self, key: &ContentKey) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| arg.replace("{key}", key.as_str()))
            .collect()
    }
}

struct Running {
    lines: Lines<BufReader<ChildStdout>>,
    child: Child,
}

fn exit_error(status: ExitStatus) -> ResolveError {
    match status.code() {
        Some(EXIT_TEMPFAIL) => ResolveError::quota("producer reported quota exhaustion"),
        Some(code) => ResolveError::network(format!("producer exited with code {}", code)),
        None => ResolveError::network("producer terminated by signal"),
    }
}

#[async_trait]
impl Producer for CommandProducer {
    fn resource_class(&self) -> Option<ResourceClass> {
        self.resource_class.clone()
    }

    async fn generate(&self, key: &ContentKey) -> Result<ProducerOutput, ResolveError> {
        let argv = self.command_line(key);
        debug!("Spawning producer: {:?}", argv);

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ResolveError::network(format!("failed to start {}: {}", argv[0], e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ResolveError::network("producer stdout was not captured"))?;

        let running = Running {
            lines: BufReader::new(stdout).lines(),
            child,
        };

        let chunks = stream::unfold(Some(running), |state| async move {
            let mut running = state?;
            match running.lines.next_line().await {
                Ok(Some(mut line)) => {
                    line.push('\n');
                    Some((Ok(Chunk::new(line)), Some(running)))
                }
                Ok(None) => match running.child.wait().await {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some((Err(exit_error(status)), None)),
                    Err(e) => Some((
                        Err(ResolveError::network(format!("waiting for producer: {}", e))),
                        None,
                    )),
                },
                Err(e) => Some((
                    Err(ResolveError::producer(
                        ProducerFailure::Malformed,
                        format!("unreadable producer output: {}", e),
                    )),
                    None,
                )),
            }
        });

        Ok(ProducerOutput::Stream(chunks.boxed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::ProducerInvoker;

    fn sh(script: &str) -> CommandProducer {
        CommandProducer::new(vec!["sh".into(), "-c".into(), script.into()]).unwrap()
    }

    fn key(s: &str) -> ContentKey {
        ContentKey::new(s).unwrap()
    }

    #[test]
    fn rejects_empty_argv() {
        assert!(CommandProducer::new(vec![]).is_none());
        assert!(CommandProducer::new(vec!["  ".into()]).is_none());
    }

    #[test]
    fn substitutes_key() {
        let producer =
            CommandProducer::new(vec!["gen".into(), "--chapter={key}".into()]).unwrap();
        assert_eq!(
            producer.command_line(&key("A1-m1-c2")),
            vec!["gen", "--chapter=A1-m1-c2"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_stdout_lines() {
        let producer = CommandProducer::new(vec![
            "sh".into(),
            "-c".into(),
            "echo \"lesson for $0\"; echo done".into(),
            "{key}".into(),
        ])
        .unwrap();

        let artifact = ProducerInvoker::default()
            .invoke(&producer, &key("LESSON-42"), None)
            .await
            .unwrap();
        assert_eq!(artifact.body, "lesson for LESSON-42\ndone\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_discards_output() {
        let err = ProducerInvoker::default()
            .invoke(&sh("echo partial; exit 3"), &key("k"), None)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::network("producer exited with code 3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tempfail_maps_to_quota() {
        let err = ProducerInvoker::default()
            .invoke(&sh("exit 75"), &key("k"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ProducerUnavailable {
                kind: ProducerFailure::Quota,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_program_is_network_failure() {
        let producer =
            CommandProducer::new(vec!["/definitely/not/a/generator".into()]).unwrap();
        let err = ProducerInvoker::default()
            .invoke(&producer, &key("k"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ProducerUnavailable {
                kind: ProducerFailure::Network,
                ..
            }
        ));
    }
}
