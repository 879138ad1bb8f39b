#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use taskmirror::error::{Error, Result};
use taskmirror::ledger::LocalChanges;
use taskmirror::notify::Notifier;
use taskmirror::remote::{RemoteSnapshot, RemoteStore};
use taskmirror::repository::{FileTaskRepository, SyncResult, TaskRepository};
use taskmirror::session::{Clock, TaskSession};
use taskmirror::storage::Storage;
use taskmirror::task::{self, Task};
use taskmirror::visibility;

/// Fixed start for stepping clocks: 2025-01-05T12:00:00Z.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0)
        .single()
        .expect("valid epoch")
}

/// A clock that advances one second per reading.
pub fn stepping_clock(start: DateTime<Utc>) -> Clock {
    let ticks = Arc::new(AtomicI64::new(0));
    Arc::new(move || start + Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst)))
}

pub fn named(name: &str) -> Task {
    Task::new(name)
}

/// In-process stand-in for a taskwarrior store.
#[derive(Default)]
pub struct FakeRemote {
    store: Mutex<Vec<Task>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    pushed: Mutex<Vec<Vec<Task>>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Arc<Self> {
        let remote = Self::default();
        *remote.store.lock().expect("store lock") = tasks;
        Arc::new(remote)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn store_tasks(&self) -> Vec<Task> {
        self.store.lock().expect("store lock").clone()
    }

    /// Replace a record as if another client had edited it.
    pub fn edit_remotely(&self, task: Task) {
        let mut store = self.store.lock().expect("store lock");
        store.retain(|existing| existing.id != task.id);
        store.push(task);
    }

    pub fn remove_remotely(&self, id: Uuid) {
        self.store
            .lock()
            .expect("store lock")
            .retain(|task| task.id != id);
    }

    pub fn pushed(&self) -> Vec<Vec<Task>> {
        self.pushed.lock().expect("pushed lock").clone()
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn reconcile(&self, _tasks: &[Task], changes: &LocalChanges) -> Result<RemoteSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Remote("store unreachable".to_string()));
        }

        let outgoing: Vec<Task> = changes
            .tasks()
            .iter()
            .filter(|task| !task.is_unnamed())
            .cloned()
            .collect();
        let mut store = self.store.lock().expect("store lock");
        for task in &outgoing {
            store.retain(|existing| existing.id != task.id);
            store.push(task.clone());
        }
        let pushed = outgoing.len();
        self.pushed.lock().expect("pushed lock").push(outgoing);

        Ok(RemoteSnapshot {
            tasks: store.clone(),
            pushed,
            conflicts: 0,
        })
    }
}

/// Repository kept entirely in memory, with a switch to make saves fail.
pub struct MemoryRepository {
    remote: Arc<FakeRemote>,
    tasks: Vec<Task>,
    local_changes: LocalChanges,
    pub stored: Vec<Task>,
    pub saves: usize,
    pub fail_saves: bool,
}

impl MemoryRepository {
    pub fn new(remote: Arc<FakeRemote>, tasks: Vec<Task>) -> Self {
        Self {
            remote,
            stored: tasks.clone(),
            tasks,
            local_changes: LocalChanges::new(),
            saves: 0,
            fail_saves: false,
        }
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository {
    async fn load(&mut self) -> Result<()> {
        self.tasks = self.stored.clone();
        Ok(())
    }

    async fn save(&mut self) -> Result<()> {
        if self.fail_saves {
            return Err(Error::OperationFailed("disk full".to_string()));
        }
        self.saves += 1;
        self.stored = self.tasks.clone();
        Ok(())
    }

    fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    fn visible_tasks(&self, tasks: &mut [Task]) -> Vec<Task> {
        visibility::visible(tasks, task::now())
    }

    fn local_changes(&self) -> &LocalChanges {
        &self.local_changes
    }

    fn local_changes_mut(&mut self) -> &mut LocalChanges {
        &mut self.local_changes
    }

    async fn taskwarrior_sync(&mut self) -> SyncResult {
        match self.remote.reconcile(&self.tasks, &self.local_changes).await {
            Ok(snapshot) => {
                self.tasks = snapshot.tasks;
                self.stored = self.tasks.clone();
                self.local_changes.clear();
                SyncResult::Success {
                    pushed: snapshot.pushed,
                    received: self.tasks.len(),
                    conflicts: snapshot.conflicts,
                }
            }
            Err(err) => SyncResult::failed(err.to_string()),
        }
    }
}

/// Notifier that records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub loaded: bool,
    pub channel_created: bool,
    pub scheduled: Vec<Vec<Uuid>>,
}

impl Notifier for RecordingNotifier {
    fn load(&mut self) {
        self.loaded = true;
    }

    fn create_notification_channel(&mut self) {
        self.channel_created = true;
    }

    fn schedule_notification_for_tasks(&mut self, tasks: &[Task]) {
        self.scheduled.push(tasks.iter().map(|task| task.id).collect());
    }
}

pub type MemorySession = TaskSession<MemoryRepository, RecordingNotifier>;

pub async fn memory_session(remote: Arc<FakeRemote>, tasks: Vec<Task>) -> MemorySession {
    let mut session = TaskSession::new(
        MemoryRepository::new(remote, tasks),
        RecordingNotifier::default(),
    )
    .with_clock(stepping_clock(epoch()));
    session.load().await.expect("load");
    session
}

/// A throwaway data directory.
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn storage(&self) -> Storage {
        Storage::new(self.dir.path().join("data"))
    }

    pub fn repository(&self, remote: Arc<FakeRemote>) -> FileTaskRepository {
        FileTaskRepository::new(self.storage(), remote)
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }
}
