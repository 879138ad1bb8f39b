//! taskmirror task command implementations.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cli::{load_session, GlobalOptions, Session};
use crate::codec;
use crate::error::{Error, Result};
use crate::filter::FilterKind;
use crate::output::{emit_success, HumanOutput};
use crate::repository::{SyncResult, TaskRepository};
use crate::session::parse_user_datetime;
use crate::task::Task;

/// Field edits shared by `add` and `modify`. `None` leaves a field alone.
#[derive(Debug, Default)]
pub struct EditOptions {
    pub name: Option<String>,
    pub project: Option<String>,
    pub tags: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub wait: Option<String>,
}

#[derive(Serialize)]
struct TaskView {
    #[serde(flatten)]
    record: Value,
    dirty: bool,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    dirty: usize,
    tasks: Vec<TaskView>,
}

#[derive(Serialize)]
struct TaskChangedOutput {
    task: TaskView,
    changed: Vec<&'static str>,
}

#[derive(Serialize)]
struct ImportOutput {
    imported: usize,
    added: usize,
    skipped: Vec<codec::SkippedRecord>,
}

#[derive(Serialize)]
struct AutocompleteOutput {
    kind: FilterKind,
    values: Vec<String>,
}

fn view(session: &Session, task: &Task) -> TaskView {
    TaskView {
        record: codec::encode(task),
        dirty: session.is_dirty(task.id),
    }
}

fn task_line(task: &Task, dirty: bool) -> String {
    let mut line = format!("[{}] {} {}", task.status, task.short_id(), task.name);
    if let Some(project) = task.project.as_ref() {
        line.push_str(&format!(" (project: {project})"));
    }
    if let Some(priority) = task.priority.as_ref() {
        line.push_str(&format!(" (priority: {priority})"));
    }
    if let Some(due) = task.due.as_ref() {
        line.push_str(&format!(" (due: {})", due.format("%Y-%m-%d %H:%M")));
    }
    if !task.tags.is_empty() {
        line.push_str(&format!(" +{}", task.tags.join(" +")));
    }
    if dirty {
        line.push_str(" *");
    }
    line
}

/// Parse a date typed on the command line, with or without a time part.
fn parse_when(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = parse_user_datetime(raw, "") {
        return Ok(at);
    }
    raw.match_indices(' ')
        .find_map(|(at, _)| parse_user_datetime(&raw[..at], &raw[at + 1..]).ok())
        .ok_or_else(|| Error::InvalidArgument(format!("unrecognized date/time '{raw}'")))
}

fn optional_date(raw: Option<&str>) -> Result<Option<Option<DateTime<Utc>>>> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(value) => parse_when(value).map(|at| Some(Some(at))),
    }
}

fn optional_text(raw: Option<String>) -> Option<Option<String>> {
    raw.map(|value| {
        let value = value.trim().to_string();
        (!value.is_empty()).then_some(value)
    })
}

/// Apply `edits` to the focused task. Dates are parsed before anything
/// changes so a bad date leaves the task untouched.
fn apply_edits(session: &mut Session, edits: EditOptions) -> Result<Vec<&'static str>> {
    let due = optional_date(edits.due.as_deref())?;
    let wait = optional_date(edits.wait.as_deref())?;
    if let Some(name) = edits.name.as_deref() {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("name cannot be empty".to_string()));
        }
    }

    let mut changed = Vec::new();
    if let Some(name) = edits.name {
        if session.set_name(name.trim()) {
            changed.push("name");
        }
    }
    if let Some(project) = optional_text(edits.project) {
        if session.set_project(project) {
            changed.push("project");
        }
    }
    if let Some(tags) = edits.tags.as_deref() {
        if session.set_tags_from_input(tags) {
            changed.push("tags");
        }
    }
    if let Some(priority) = optional_text(edits.priority) {
        if session.set_priority(priority) {
            changed.push("priority");
        }
    }
    if let Some(due) = due {
        if session.set_due(due) {
            changed.push("due");
        }
    }
    if let Some(wait) = wait {
        if session.set_wait(wait) {
            changed.push("wait");
        }
    }
    Ok(changed)
}

fn emit_task_changed(
    global: &GlobalOptions,
    session: &Session,
    command: &str,
    header: &str,
    task: &Task,
    changed: Vec<&'static str>,
) -> Result<()> {
    let dirty = session.is_dirty(task.id);
    let mut human = HumanOutput::new(header);
    human.push_summary("ID", task.id.to_string());
    human.push_summary("Name", task.name.clone());
    human.push_summary("Status", task.status.clone());
    if !changed.is_empty() {
        human.push_summary("Changed", changed.join(", "));
    }
    if dirty {
        human.push_next_step("taskmirror sync");
    }

    emit_success(
        global.output,
        command,
        &TaskChangedOutput {
            task: view(session, task),
            changed,
        },
        Some(&human),
    )
}

pub async fn run_list(global: &GlobalOptions, all: bool) -> Result<()> {
    let mut session = load_session(global).await?;
    let before = session.tasks().to_vec();
    let tasks = if all {
        before.clone()
    } else {
        session.visible_tasks()
    };

    // Elapsed waits were promoted while computing visibility.
    if session.tasks() != before.as_slice() {
        session.save().await?;
    }

    let dirty = session.repository().local_changes().len();
    let output = TaskListOutput {
        total: tasks.len(),
        dirty,
        tasks: tasks.iter().map(|task| view(&session, task)).collect(),
    };

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    if dirty > 0 {
        human.push_summary("Unsynced changes", dirty.to_string());
    }
    for task in &tasks {
        human.push_detail(task_line(task, session.is_dirty(task.id)));
    }

    emit_success(global.output, "list", &output, Some(&human))
}

pub async fn run_add(global: &GlobalOptions, edits: EditOptions) -> Result<()> {
    if edits.name.as_deref().map_or(true, |name| name.trim().is_empty()) {
        return Err(Error::InvalidArgument("name cannot be empty".to_string()));
    }

    let mut session = load_session(global).await?;
    let id = session.add_task().id;
    session.open_task(id);
    let result = apply_edits(&mut session, edits);
    session.detail_closed();
    let changed = result?;
    session.save().await?;

    let task = session
        .task(id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
    emit_task_changed(global, &session, "add", "Task added", &task, changed)
}

pub async fn run_show(global: &GlobalOptions, input: &str) -> Result<()> {
    let session = load_session(global).await?;
    let id = session.resolve_id(input)?;
    let task = session
        .task(id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(input.to_string()))?;

    let mut human = HumanOutput::new(task.name.clone());
    human.push_summary("ID", task.id.to_string());
    human.push_summary("Status", task.status.clone());
    if let Some(project) = task.project.as_ref() {
        human.push_summary("Project", project.clone());
    }
    if let Some(priority) = task.priority.as_ref() {
        human.push_summary("Priority", priority.clone());
    }
    if !task.tags.is_empty() {
        human.push_summary("Tags", task.tags.join(", "));
    }
    human.push_summary("Created", codec::format_timestamp(&task.created));
    if let Some(due) = task.due.as_ref() {
        human.push_summary("Due", codec::format_timestamp(due));
    }
    if let Some(wait) = task.wait_attribute() {
        human.push_summary("Wait", codec::format_timestamp(&wait));
    }
    if let Some(modified) = task.modified.as_ref() {
        human.push_summary("Modified", codec::format_timestamp(modified));
    }
    for (key, value) in &task.others {
        human.push_detail(format!("{key}: {value}"));
    }
    if session.is_dirty(task.id) {
        human.push_warning("local changes not yet synced");
    }

    emit_success(global.output, "show", &view(&session, &task), Some(&human))
}

pub async fn run_modify(global: &GlobalOptions, input: &str, edits: EditOptions) -> Result<()> {
    let mut session = load_session(global).await?;
    let id = session.resolve_id(input)?;
    session.open_task(id);
    let result = apply_edits(&mut session, edits);
    session.detail_closed();
    let changed = result?;
    if !changed.is_empty() {
        session.save().await?;
    }

    let task = session
        .task(id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(input.to_string()))?;
    emit_task_changed(global, &session, "modify", "Task modified", &task, changed)
}

pub async fn run_done(global: &GlobalOptions, input: &str) -> Result<()> {
    let mut session = load_session(global).await?;
    let id = session.resolve_id(input)?;
    let task = session.mark_complete(id)?;
    session.save().await?;
    emit_task_changed(global, &session, "done", "Task completed", &task, vec!["status"])
}

pub async fn run_delete(global: &GlobalOptions, input: &str) -> Result<()> {
    let mut session = load_session(global).await?;
    let id = session.resolve_id(input)?;
    let task = session.delete(id)?;
    session.save().await?;
    emit_task_changed(global, &session, "delete", "Task deleted", &task, vec!["status"])
}

pub async fn run_sync(global: &GlobalOptions) -> Result<()> {
    let mut session = load_session(global).await?;
    let result = session.sync().await;
    let (pushed, received, conflicts) = match &result {
        SyncResult::Success {
            pushed,
            received,
            conflicts,
        } => (*pushed, *received, *conflicts),
        SyncResult::Failed { reason } => {
            return Err(Error::OperationFailed(format!("sync failed: {reason}")));
        }
    };
    session.update_pending_notifications();

    let mut human = HumanOutput::new("Sync complete");
    human.push_summary("Pushed", pushed.to_string());
    human.push_summary("Received", received.to_string());
    if conflicts > 0 {
        human.push_warning(format!(
            "{conflicts} pushed task(s) came back changed by the store"
        ));
    }
    let reminders = session.notifier().pending().len();
    if reminders > 0 {
        human.push_summary("Reminders", reminders.to_string());
    }

    emit_success(global.output, "sync", &result, Some(&human))
}

pub async fn run_import(global: &GlobalOptions, file: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(file).await?;
    let report = codec::parse_export(&text);
    let imported = report.tasks.len();

    let mut session = load_session(global).await?;
    let added = session.import_tasks(report.tasks);
    if imported > 0 {
        session.save().await?;
    }

    let mut human = HumanOutput::new("Import complete");
    human.push_summary("Imported", imported.to_string());
    human.push_summary("New", added.to_string());
    for skipped in &report.skipped {
        human.push_warning(format!("record {}: {}", skipped.index, skipped.reason));
    }
    if imported > 0 {
        human.push_next_step("taskmirror sync");
    }

    emit_success(
        global.output,
        "import",
        &ImportOutput {
            imported,
            added,
            skipped: report.skipped,
        },
        Some(&human),
    )
}

/// Prints the raw record array regardless of `--json`; the output is meant
/// to be piped into `task import`.
pub async fn run_export(global: &GlobalOptions) -> Result<()> {
    let session = load_session(global).await?;
    println!("{}", codec::encode_batch(session.tasks()));
    Ok(())
}

pub async fn run_autocomplete(global: &GlobalOptions, kind: &str, prefix: &str) -> Result<()> {
    let kind = FilterKind::parse(kind)?;
    let session = load_session(global).await?;
    let values = session.autocompletes(kind, prefix);

    let mut human = HumanOutput::new(format!("Values for {kind}"));
    for value in &values {
        human.push_detail(value.clone());
    }

    emit_success(
        global.output,
        "autocomplete",
        &AutocompleteOutput { kind, values },
        Some(&human),
    )
}
