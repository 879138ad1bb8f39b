//! The task session: single owner of the live task list.
//!
//! Every edit goes through a `TaskSession` method that applies the change
//! and records the task in the repository's local change ledger in one
//! step. `save` persists without clearing the ledger; only a successful
//! `sync` does that.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::filter::{self, FilterKind};
use crate::notify::Notifier;
use crate::repository::{SyncResult, TaskRepository};
use crate::signal::{close_detail_channel, CloseDetailListener, CloseDetailNotifier};
use crate::task::{self, Task, STATUS_COMPLETED, STATUS_DELETED};

/// Source of "now" for modification and end stamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(task::now)
}

pub struct TaskSession<R, N> {
    repository: R,
    notifier: N,
    tasks: Vec<Task>,
    current_id: Option<Uuid>,
    close_detail: CloseDetailNotifier,
    close_listener: Option<CloseDetailListener>,
    clock: Clock,
}

impl<R: TaskRepository, N: Notifier> TaskSession<R, N> {
    pub fn new(repository: R, mut notifier: N) -> Self {
        notifier.load();
        notifier.create_notification_channel();
        let (close_detail, close_listener) = close_detail_channel();
        let tasks = repository.tasks().to_vec();
        Self {
            repository,
            notifier,
            tasks,
            current_id: None,
            close_detail,
            close_listener: Some(close_listener),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Hand out the close-detail listener. Only the first caller gets it.
    pub fn take_close_detail_listener(&mut self) -> Option<CloseDetailListener> {
        self.close_listener.take()
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn is_dirty(&self, id: Uuid) -> bool {
        self.repository.local_changes().contains(&id)
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn open_task(&mut self, id: Uuid) {
        self.current_id = Some(id);
    }

    pub fn detail_closed(&mut self) {
        self.current_id = None;
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current_id
    }

    /// The focused task, if it is still in the list.
    pub fn current_task(&self) -> Option<&Task> {
        self.current_id.and_then(|id| self.task(id))
    }

    fn current_index(&self) -> Option<usize> {
        let id = self.current_id?;
        self.tasks.iter().position(|task| task.id == id)
    }

    /// Resolve a full uuid or a unique prefix of one.
    pub fn resolve_id(&self, input: &str) -> Result<Uuid> {
        let needle = input.trim().to_ascii_lowercase().replace('-', "");
        if needle.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }

        let mut matches: Vec<Uuid> = self
            .tasks
            .iter()
            .map(|task| task.id)
            .filter(|id| id.simple().to_string().starts_with(&needle))
            .collect();
        matches.dedup();

        match matches.len() {
            0 => Err(Error::TaskNotFound(input.trim().to_string())),
            1 => Ok(matches[0]),
            _ => Err(Error::AmbiguousTask {
                input: input.trim().to_string(),
                candidates: matches
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn load(&mut self) -> Result<()> {
        self.repository.load().await?;
        self.tasks = self.repository.tasks().to_vec();
        Ok(())
    }

    pub async fn save(&mut self) -> Result<()> {
        self.remove_unnamed_tasks();
        self.repository.set_tasks(self.tasks.clone());
        self.repository.save().await?;
        self.notifier.schedule_notification_for_tasks(&self.tasks);
        Ok(())
    }

    /// Save, reconcile with the remote store and adopt its result.
    ///
    /// A failed cycle, including a failed save, is reported through the
    /// returned `SyncResult` and leaves the list and ledger as they were.
    pub async fn sync(&mut self) -> SyncResult {
        if let Err(err) = self.save().await {
            tracing::warn!(error = %err, "save before sync failed");
            return SyncResult::failed(err.to_string());
        }
        self.remove_unnamed_tasks();

        let result = self.repository.taskwarrior_sync().await;
        if !result.is_success() {
            return result;
        }

        self.tasks = self.repository.tasks().to_vec();
        if self.current_id.is_some() && self.current_index().is_none() {
            tracing::debug!("focused task gone after sync, closing detail");
            self.close_detail.notify();
        }
        result
    }

    pub fn update_pending_notifications(&mut self) {
        self.notifier.schedule_notification_for_tasks(&self.tasks);
    }

    /// Drop blank tasks other than the focused one from the list.
    ///
    /// Ledger entries stay until a sync succeeds; the push skips blank
    /// records since the store rejects them.
    pub fn remove_unnamed_tasks(&mut self) {
        let current = self.current_id;
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.is_unnamed() || Some(task.id) == current);
        let removed = before - self.tasks.len();
        if removed > 0 {
            tracing::debug!(count = removed, "removed unnamed tasks");
        }
    }

    pub fn visible_tasks(&mut self) -> Vec<Task> {
        self.repository.visible_tasks(&mut self.tasks)
    }

    pub fn autocompletes(&self, kind: FilterKind, prefix: &str) -> Vec<String> {
        filter::autocompletes(kind, prefix, &self.tasks)
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Stamp the task at `index` and record it in the ledger.
    fn task_updated(&mut self, index: usize) {
        let now = (self.clock)();
        let task = &mut self.tasks[index];
        task.modified = Some(now);
        self.repository.local_changes_mut().mark(task.clone());
    }

    fn update_current<F: FnOnce(&mut Task)>(&mut self, apply: F) -> bool {
        let Some(index) = self.current_index() else {
            tracing::debug!("edit ignored, no task is open");
            return false;
        };
        apply(&mut self.tasks[index]);
        self.task_updated(index);
        true
    }

    pub fn add_task(&mut self) -> Task {
        self.tasks.push(Task::new(""));
        let index = self.tasks.len() - 1;
        self.task_updated(index);
        self.tasks[index].clone()
    }

    /// Merge records from a store export into the list and mark them dirty.
    ///
    /// Records keep their own modification stamps. Returns how many were
    /// not already in the list.
    pub fn import_tasks(&mut self, tasks: Vec<Task>) -> usize {
        let mut added = 0;
        for task in tasks {
            match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
                Some(existing) => *existing = task.clone(),
                None => {
                    self.tasks.push(task.clone());
                    added += 1;
                }
            }
            self.repository.local_changes_mut().mark(task);
        }
        added
    }

    pub fn mark_complete(&mut self, id: Uuid) -> Result<Task> {
        self.finish(id, STATUS_COMPLETED)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Task> {
        let was_current = self.current_id == Some(id);
        let task = self.finish(id, STATUS_DELETED)?;
        if was_current {
            self.current_id = None;
        }
        Ok(task)
    }

    fn finish(&mut self, id: Uuid, status: &str) -> Result<Task> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

        if self.current_id == Some(id) {
            self.close_detail.notify();
        }

        let now = (self.clock)();
        {
            let task = &mut self.tasks[index];
            task.status = status.to_string();
            task.end = Some(now);
        }
        self.task_updated(index);
        let task = self.tasks.remove(index);
        tracing::debug!(task = %task.id, status, "task closed");
        Ok(task)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update_current(|task| task.name = name)
    }

    pub fn set_tags(&mut self, tags: Vec<String>) -> bool {
        self.update_current(|task| task.tags = tags)
    }

    /// Set tags from comma separated user input.
    pub fn set_tags_from_input(&mut self, input: &str) -> bool {
        self.set_tags(parse_tags(input))
    }

    pub fn set_project(&mut self, project: Option<String>) -> bool {
        self.update_current(|task| task.project = project)
    }

    pub fn set_priority(&mut self, priority: Option<String>) -> bool {
        self.update_current(|task| task.priority = priority)
    }

    pub fn set_due(&mut self, due: Option<DateTime<Utc>>) -> bool {
        self.update_current(|task| task.due = due)
    }

    pub fn set_wait(&mut self, wait: Option<DateTime<Utc>>) -> bool {
        self.update_current(|task| task.wait = wait)
    }

    pub fn set_due_from_input(&mut self, date: &str, time: &str) -> Result<bool> {
        let due = parse_user_datetime(date, time)?;
        Ok(self.set_due(Some(due)))
    }

    pub fn set_wait_from_input(&mut self, date: &str, time: &str) -> Result<bool> {
        let wait = parse_user_datetime(date, time)?;
        Ok(self.set_wait(Some(wait)))
    }
}

pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

const USER_DATETIME_FORMATS: [&str; 3] = ["%b %d, %Y %I:%M %p", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];
const USER_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%b %d, %Y"];

/// Parse a date and time typed in local time.
///
/// Accepts "Jan 05, 2025" + "03:30 PM" or "2025-01-05" + "15:30". An empty
/// time means midnight.
pub fn parse_user_datetime(date: &str, time: &str) -> Result<DateTime<Utc>> {
    let date = date.trim();
    let time = time.trim();

    let naive = if time.is_empty() {
        USER_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
            .and_then(|day| day.and_hms_opt(0, 0, 0))
    } else {
        let combined = format!("{date} {time}");
        USER_DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(&combined, format).ok())
    }
    .ok_or_else(|| Error::InvalidArgument(format!("unrecognized date/time '{date} {time}'")))?;

    Local
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| Error::InvalidArgument(format!("ambiguous local time '{date} {time}'")))
}
