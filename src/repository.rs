//! Persistence collaborator for the task session.
//!
//! A [`TaskRepository`] owns the stored task list and the local change
//! ledger, applies visibility and filters, and runs the remote round trip.
//! [`FileTaskRepository`] keeps everything in a [`Storage`] data directory
//! and delegates reconciliation to a [`RemoteStore`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::filter::FilterSet;
use crate::ledger::LocalChanges;
use crate::remote::RemoteStore;
use crate::storage::Storage;
use crate::task::{self, Task};
use crate::visibility;

/// How a sync cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncResult {
    Success {
        pushed: usize,
        received: usize,
        conflicts: usize,
    },
    Failed {
        reason: String,
    },
}

impl SyncResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncResult::Success { .. })
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        SyncResult::Failed {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait TaskRepository: Send {
    async fn load(&mut self) -> Result<()>;

    async fn save(&mut self) -> Result<()>;

    fn tasks(&self) -> &[Task];

    fn set_tasks(&mut self, tasks: Vec<Task>);

    /// Tasks to show, after visibility and any configured filters.
    ///
    /// Waiting tasks whose wait has elapsed are promoted in `tasks`.
    fn visible_tasks(&self, tasks: &mut [Task]) -> Vec<Task>;

    fn local_changes(&self) -> &LocalChanges;

    fn local_changes_mut(&mut self) -> &mut LocalChanges;

    /// Reconcile with the remote store.
    ///
    /// On success the stored list becomes the authoritative one and the
    /// ledger is cleared. On failure neither changes.
    async fn taskwarrior_sync(&mut self) -> SyncResult;
}

pub struct FileTaskRepository {
    storage: Storage,
    remote: Arc<dyn RemoteStore>,
    tasks: Vec<Task>,
    local_changes: LocalChanges,
    filters: FilterSet,
}

impl FileTaskRepository {
    pub fn new(storage: Storage, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            storage,
            remote,
            tasks: Vec::new(),
            local_changes: LocalChanges::new(),
            filters: FilterSet::new(),
        }
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }

    pub fn save_filters(&self) -> Result<()> {
        self.storage.write_filters(&self.filters)
    }

    async fn persist(&self, tasks: Vec<Task>, changes: Vec<Task>) -> Result<()> {
        blocking(&self.storage, move |storage| {
            storage.init()?;
            storage.write_tasks(&storage.tasks_file(), &tasks)?;
            storage.write_tasks(&storage.local_changes_file(), &changes)
        })
        .await
    }
}

async fn blocking<T, F>(storage: &Storage, f: F) -> Result<T>
where
    F: FnOnce(Storage) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let storage = storage.clone();
    tokio::task::spawn_blocking(move || f(storage))
        .await
        .map_err(|err| Error::OperationFailed(format!("storage task failed: {err}")))?
}

#[async_trait]
impl TaskRepository for FileTaskRepository {
    async fn load(&mut self) -> Result<()> {
        let (tasks, changes, filters) = blocking(&self.storage, |storage| {
            let tasks = storage.read_tasks(&storage.tasks_file())?;
            let changes = storage.read_tasks(&storage.local_changes_file())?;
            let filters = storage.read_filters()?;
            Ok((tasks, changes, filters))
        })
        .await?;

        let skipped = tasks.skipped.len() + changes.skipped.len();
        if skipped > 0 {
            tracing::warn!(skipped, "ignored unreadable records while loading");
        }
        tracing::debug!(
            tasks = tasks.tasks.len(),
            local_changes = changes.tasks.len(),
            "loaded task data"
        );

        self.tasks = tasks.tasks;
        self.local_changes = LocalChanges::from_tasks(changes.tasks);
        self.filters = filters;
        Ok(())
    }

    async fn save(&mut self) -> Result<()> {
        self.persist(self.tasks.clone(), self.local_changes.tasks().to_vec())
            .await
    }

    fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    fn visible_tasks(&self, tasks: &mut [Task]) -> Vec<Task> {
        let now = task::now();
        self.filters.apply(visibility::visible(tasks, now), now)
    }

    fn local_changes(&self) -> &LocalChanges {
        &self.local_changes
    }

    fn local_changes_mut(&mut self) -> &mut LocalChanges {
        &mut self.local_changes
    }

    async fn taskwarrior_sync(&mut self) -> SyncResult {
        let snapshot = match self.remote.reconcile(&self.tasks, &self.local_changes).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "sync failed, keeping local state");
                return SyncResult::failed(err.to_string());
            }
        };

        // Adopt the new state only once it is on disk.
        if let Err(err) = self.persist(snapshot.tasks.clone(), Vec::new()).await {
            tracing::warn!(error = %err, "could not store synced tasks, keeping local state");
            return SyncResult::failed(err.to_string());
        }

        self.tasks = snapshot.tasks;
        self.local_changes.clear();
        tracing::info!(
            pushed = snapshot.pushed,
            received = self.tasks.len(),
            conflicts = snapshot.conflicts,
            "sync complete"
        );
        SyncResult::Success {
            pushed: snapshot.pushed,
            received: self.tasks.len(),
            conflicts: snapshot.conflicts,
        }
    }
}
