//! Which tasks belong in the live list.
//!
//! Evaluating visibility of a `waiting` task may rewrite its status to
//! `pending` once its wait time has passed. That transition lives in
//! [`promote_if_wait_elapsed`] so callers can trigger and observe it on its
//! own.

use chrono::{DateTime, Utc};

use crate::task::{Task, HIDDEN_STATUSES, STATUS_PENDING, STATUS_WAITING};

/// Returns whether `task` should be shown at `now`.
///
/// May change a `waiting` task to `pending` (see [`promote_if_wait_elapsed`]).
pub fn should_display(task: &mut Task, now: DateTime<Utc>) -> bool {
    if !HIDDEN_STATUSES.contains(&task.status.as_str()) {
        return true;
    }
    promote_if_wait_elapsed(task, now)
}

/// Flip a `waiting` task to `pending` when its wait time is not in the future.
///
/// Returns true when the task was promoted. Tasks in any other status, and
/// waiting tasks with an absent, malformed or future wait time, are left
/// untouched.
pub fn promote_if_wait_elapsed(task: &mut Task, now: DateTime<Utc>) -> bool {
    if !task.has_status(STATUS_WAITING) {
        return false;
    }
    match task.wait_attribute() {
        Some(wait) if wait <= now => {
            tracing::debug!(task = %task.id, "wait elapsed, task is pending again");
            task.status = STATUS_PENDING.to_string();
            true
        }
        _ => false,
    }
}

/// Keep the tasks that should be displayed, promoting elapsed waits in place.
pub fn visible(tasks: &mut [Task], now: DateTime<Utc>) -> Vec<Task> {
    tasks
        .iter_mut()
        .filter_map(|task| should_display(task, now).then(|| task.clone()))
        .collect()
}
