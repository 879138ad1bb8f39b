//! Due-date reminders.
//!
//! The session hands every saved task list to a [`Notifier`]. Scheduling is
//! fire-and-forget: a notifier that cannot deliver logs and moves on.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::task::{self, Task, HIDDEN_STATUSES};

pub trait Notifier: Send {
    fn load(&mut self);

    fn create_notification_channel(&mut self);

    /// Replace all pending reminders with ones derived from `tasks`.
    fn schedule_notification_for_tasks(&mut self, tasks: &[Task]);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub task_id: Uuid,
    pub name: String,
    pub due: DateTime<Utc>,
    pub fire_at: DateTime<Utc>,
}

/// Keeps one reminder per open task with a future due date.
#[derive(Debug, Clone)]
pub struct ReminderScheduler {
    enabled: bool,
    lead: Duration,
    channel_ready: bool,
    reminders: Vec<Reminder>,
}

impl ReminderScheduler {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            lead: Duration::try_minutes(config.lead_minutes).unwrap_or_else(|| {
                tracing::warn!(
                    lead_minutes = config.lead_minutes,
                    "reminder lead out of range, firing at the due time"
                );
                Duration::zero()
            }),
            channel_ready: false,
            reminders: Vec::new(),
        }
    }

    pub fn pending(&self) -> &[Reminder] {
        &self.reminders
    }

    fn plan(&self, tasks: &[Task], now: DateTime<Utc>) -> Vec<Reminder> {
        let mut reminders: Vec<Reminder> = tasks
            .iter()
            .filter(|task| !HIDDEN_STATUSES.contains(&task.status.as_str()))
            .filter_map(|task| {
                let due = task.due.filter(|due| *due > now)?;
                Some(Reminder {
                    task_id: task.id,
                    name: task.name.clone(),
                    due,
                    fire_at: due
                        .checked_sub_signed(self.lead)
                        .map_or(now, |at| std::cmp::max(at, now)),
                })
            })
            .collect();
        reminders.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.task_id.cmp(&b.task_id)));
        reminders
    }
}

impl Notifier for ReminderScheduler {
    fn load(&mut self) {
        self.reminders.clear();
    }

    fn create_notification_channel(&mut self) {
        self.channel_ready = true;
    }

    fn schedule_notification_for_tasks(&mut self, tasks: &[Task]) {
        if !self.enabled {
            self.reminders.clear();
            return;
        }
        if !self.channel_ready {
            tracing::debug!("notification channel not created yet, creating");
            self.create_notification_channel();
        }
        self.reminders = self.plan(tasks, task::now());
        if let Some(next) = self.reminders.first() {
            tracing::info!(
                count = self.reminders.len(),
                next = %next.fire_at,
                "scheduled due-date reminders"
            );
        }
    }
}
