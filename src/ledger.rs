//! Local change ledger.
//!
//! Holds the latest snapshot of every task edited since the last completed
//! sync, keyed by task identity. Terminal transitions stay in the ledger
//! after the task leaves the live list, so the store still hears about them.

use uuid::Uuid;

use crate::task::Task;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalChanges {
    entries: Vec<Task>,
}

impl LocalChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut ledger = Self::new();
        for task in tasks {
            ledger.mark(task);
        }
        ledger
    }

    /// Record `task` as dirty. An existing entry with the same id is
    /// replaced in place; returns true when the task was not yet tracked.
    pub fn mark(&mut self, task: Task) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == task.id) {
            Some(entry) => {
                *entry = task;
                false
            }
            None => {
                self.entries.push(task);
                true
            }
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.iter().any(|entry| entry.id == *id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Task> {
        self.entries.iter().find(|entry| entry.id == *id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
