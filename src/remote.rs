//! Remote reconciliation.
//!
//! A [`RemoteStore`] receives the local list and the ledger and answers with
//! the authoritative post-sync list. How conflicting edits are settled is up
//! to the implementation; [`TaskwarriorCommand`] pushes local edits through
//! the store's `import` (so the pushed version wins on the store's side) and
//! then adopts whatever `export` reports.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::codec;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::ledger::LocalChanges;
use crate::task::Task;

/// Outcome of a successful remote round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSnapshot {
    /// Authoritative task list after the round trip.
    pub tasks: Vec<Task>,
    pub pushed: usize,
    /// Pushed tasks whose authoritative version differs from what was sent.
    pub conflicts: usize,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn reconcile(&self, tasks: &[Task], changes: &LocalChanges) -> Result<RemoteSnapshot>;
}

/// Talks to a taskwarrior-compatible binary.
#[derive(Debug, Clone)]
pub struct TaskwarriorCommand {
    config: SyncConfig,
}

impl TaskwarriorCommand {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    async fn run(&self, subcommand: &[&str], stdin: Option<String>) -> Result<String> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .args(subcommand)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command = %self.config.command, ?subcommand, "running store command");
        let mut child = command.spawn().map_err(|err| {
            Error::Remote(format!("failed to start '{}': {err}", self.config.command))
        })?;

        // The stdin write counts against the timeout: a store that never
        // reads would otherwise block us once the pipe buffer is full.
        let exchange = async move {
            if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
                pipe.write_all(input.as_bytes()).await?;
                drop(pipe);
            }
            child.wait_with_output().await
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| {
                Error::Remote(format!(
                    "'{} {}' timed out after {}s",
                    self.config.command,
                    subcommand.join(" "),
                    self.config.timeout_secs
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Remote(format!(
                "'{} {}' exited with {}: {}",
                self.config.command,
                subcommand.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RemoteStore for TaskwarriorCommand {
    async fn reconcile(&self, _tasks: &[Task], changes: &LocalChanges) -> Result<RemoteSnapshot> {
        // Blank records stay in the ledger but the store rejects them.
        let outgoing: Vec<Task> = changes
            .tasks()
            .iter()
            .filter(|task| !task.is_unnamed())
            .cloned()
            .collect();
        if !outgoing.is_empty() {
            self.run(&["import", "-"], Some(codec::encode_batch(&outgoing)))
                .await?;
        }
        if self.config.run_sync {
            self.run(&["sync"], None).await?;
        }

        let exported = self.run(&["export"], None).await?;
        let report = codec::parse_export(&exported);
        if !report.skipped.is_empty() {
            tracing::warn!(
                skipped = report.skipped.len(),
                "store export contained records that could not be decoded"
            );
        }

        Ok(RemoteSnapshot {
            conflicts: count_conflicts(changes, &report.tasks),
            pushed: outgoing.len(),
            tasks: report.tasks,
        })
    }
}

/// Pushed tasks that came back with a different modification stamp.
pub fn count_conflicts(changes: &LocalChanges, authoritative: &[Task]) -> usize {
    changes
        .tasks()
        .iter()
        .filter(|pushed| {
            authoritative
                .iter()
                .find(|task| task.id == pushed.id)
                .map(|task| task.modified != pushed.modified)
                .unwrap_or(false)
        })
        .count()
}
